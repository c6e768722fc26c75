use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use proteggo_core::AppError;
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeliveryQuery {
    #[serde(default)]
    token: String,
}

/// Serve an object through its delivery URL.
///
/// Objects are only readable with the download token minted when the URL was issued.
#[tracing::instrument(skip(state, query))]
pub async fn download_object(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<DeliveryQuery>,
) -> Result<Response, HttpAppError> {
    if bucket != state.publisher.urls().bucket() {
        return Err(AppError::NotFound(format!("Bucket {} not found", bucket)).into());
    }

    if !state.publisher.verify_token(&key, &query.token).await? {
        return Err(AppError::Forbidden("Invalid download token".to_string()).into());
    }

    let metadata = state.storage.metadata(&key).await?;
    let data = state.storage.get(&key).await?;

    let content_type = HeaderValue::from_str(&metadata.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok(([(header::CONTENT_TYPE, content_type)], data).into_response())
}
