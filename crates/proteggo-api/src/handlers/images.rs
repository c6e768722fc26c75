use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use proteggo_core::AppError;
use serde_json::{json, Value};

use crate::constants::MAX_FILES_PER_UPLOAD;
use crate::error::{HttpAppError, ValidatedJson};
use crate::services::{
    DeleteImagesRequest, DeleteOutcome, ImagePathsPage, ListImagesQuery, MaintenanceService,
    UploadOutcome, UploadService, UploadedFile,
};
use crate::state::AppState;

/// Upload images handler
///
/// Every file part of the multipart body is one image; its field name is the
/// client-chosen image id. All parts are validated before anything is stored, so a
/// single oversized or unsupported file rejects the whole request.
///
/// # Returns
/// `{uploadedIds, failedIds}` partitioning the ids by store/enqueue success.
///
/// # Errors
/// - `AppError::InvalidInput` - No file parts, too many parts, or a malformed body
/// - `AppError::PayloadTooLarge` - A file exceeds the upload size cap
/// - `AppError::Validation` - A file is empty or neither JPEG nor PNG
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_images"))]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, HttpAppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        // Plain form fields carry no image.
        if field.file_name().is_none() {
            continue;
        }
        let image_id = field.name().unwrap_or_default().to_string();

        if files.len() == MAX_FILES_PER_UPLOAD {
            return Err(AppError::InvalidInput(format!(
                "At most {} files can be uploaded at once",
                MAX_FILES_PER_UPLOAD
            ))
            .into());
        }

        let data = field.bytes().await?;
        files.push(UploadedFile { image_id, data });
    }

    if files.is_empty() {
        return Err(AppError::InvalidInput("No image files in request".to_string()).into());
    }

    let outcome = UploadService::new(&state).accept(files).await?;
    Ok(Json(outcome))
}

#[tracing::instrument(skip(state))]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<ImagePathsPage>, HttpAppError> {
    let page = MaintenanceService::new(&state).list_images(query).await?;
    Ok(Json(page))
}

#[tracing::instrument(skip(state, request))]
pub async fn delete_images(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteImagesRequest>,
) -> Result<Json<DeleteOutcome>, HttpAppError> {
    let outcome = MaintenanceService::new(&state).delete_images(request).await;
    Ok(Json(outcome))
}

#[tracing::instrument(skip(state))]
pub async fn purge_temp(State(state): State<Arc<AppState>>) -> Result<Json<Value>, HttpAppError> {
    let deleted = MaintenanceService::new(&state).purge_temp().await?;
    Ok(Json(json!({
        "message": format!("Deleted {} temporary files", deleted),
        "error": false,
    })))
}

#[tracing::instrument(skip(state))]
pub async fn delete_unused(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeleteOutcome>, HttpAppError> {
    let outcome = MaintenanceService::new(&state).delete_unused().await?;
    Ok(Json(outcome))
}
