//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Library errors convert into
//! `AppError` here so every failure renders with the same body, status and log line.

use axum::{
    extract::rejection::JsonRejection,
    extract::{multipart::MultipartError, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use proteggo_core::{AppError, ErrorMetadata, LogLevel, TaskError};
use proteggo_db::DocumentError;
use proteggo_detection::DetectionError;
use proteggo_processing::{CodecError, ValidationError};
use proteggo_storage::StorageError;
use proteggo_worker::{DispatchError, SignatureError};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: AppError lives in proteggo-core, IntoResponse in axum).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid multipart body: {}",
            err.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are hidden in production and for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other if other.is_transient() => AppError::Transient(other.to_string()),
            other => AppError::Storage(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<DocumentError> for HttpAppError {
    fn from(err: DocumentError) -> Self {
        let app = match err {
            DocumentError::NotFound(msg) => AppError::NotFound(msg),
            DocumentError::InvalidQuery(msg) => AppError::InvalidInput(msg),
            DocumentError::Data { .. } => AppError::Data(err.to_string()),
            other if other.is_transient() => AppError::Transient(other.to_string()),
            other => AppError::Internal(other.to_string()),
        };
        HttpAppError(app)
    }
}

impl From<ValidationError> for HttpAppError {
    fn from(err: ValidationError) -> Self {
        let app = match err {
            ValidationError::FileTooLarge { size, max } => {
                AppError::PayloadTooLarge(format!("{} bytes exceeds max {} bytes", size, max))
            }
            ValidationError::InvalidContentType {
                content_type,
                allowed,
            } => AppError::Validation(format!(
                "Invalid content type '{}', allowed: {:?}",
                content_type, allowed
            )),
            ValidationError::InvalidFilename(id) => {
                AppError::InvalidInput(format!("Invalid image id '{}'", id))
            }
            ValidationError::EmptyFile => AppError::Validation("File is empty".to_string()),
        };
        HttpAppError(app)
    }
}

impl From<CodecError> for HttpAppError {
    fn from(err: CodecError) -> Self {
        HttpAppError(AppError::ImageProcessing(err.to_string()))
    }
}

impl From<DetectionError> for HttpAppError {
    fn from(err: DetectionError) -> Self {
        let app = if err.is_transient() {
            AppError::Transient(err.to_string())
        } else {
            AppError::Permanent(err.to_string())
        };
        HttpAppError(app)
    }
}

impl From<DispatchError> for HttpAppError {
    fn from(err: DispatchError) -> Self {
        let app = if err.is_transient() {
            AppError::Transient(err.to_string())
        } else {
            AppError::Internal(err.to_string())
        };
        HttpAppError(app)
    }
}

impl From<SignatureError> for HttpAppError {
    fn from(err: SignatureError) -> Self {
        HttpAppError(AppError::Unauthorized(err.to_string()))
    }
}

/// Transient task failures answer 503 so the queue retries; permanent ones 422 so it stops.
impl From<TaskError> for HttpAppError {
    fn from(err: TaskError) -> Self {
        let message = format!("{:#}", err.inner());
        let app = if err.is_recoverable() {
            AppError::Transient(message)
        } else {
            AppError::Permanent(message)
        };
        HttpAppError(app)
    }
}
