use std::sync::Arc;
use std::time::Duration;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use proteggo_core::constants::TASK_SIGNATURE_HEADER;
use proteggo_core::models::UploadTask;
use proteggo_core::AppError;
use serde_json::Value;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Task queue callback that runs the image processing pipeline for one upload.
///
/// Answers 200 with `{status, imageId, url}` once the image record is persisted,
/// 503 for failures worth retrying and 422 for ones that are not. When a signing
/// secret is configured the request must carry a valid signature header.
#[tracing::instrument(skip(state, headers, body), fields(body_len = body.len()))]
pub async fn process_upload_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, HttpAppError> {
    if let Some(signer) = &state.task_signer {
        let signature = headers
            .get(TASK_SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok());
        signer.verify(signature, &body).map_err(|e| {
            tracing::warn!(error = %e, "Rejected unsigned or tampered task request");
            HttpAppError::from(e)
        })?;
    }

    let task = UploadTask::from_json(&body)
        .map_err(|e| AppError::Permanent(format!("Malformed upload task: {:#}", e)))?;

    let timeout = Duration::from_secs(state.config.task_timeout_secs());
    let result = tokio::time::timeout(timeout, state.image_processing.process(&state, &task))
        .await
        .map_err(|_| {
            AppError::Transient(format!(
                "Processing image {} exceeded {}s",
                task.id,
                timeout.as_secs()
            ))
        })??;

    Ok(Json(result.to_json()))
}
