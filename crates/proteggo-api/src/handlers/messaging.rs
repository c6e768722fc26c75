use std::sync::Arc;

use axum::{extract::State, Json};
use proteggo_core::models::MessagingToken;
use proteggo_core::AppError;
use serde_json::{json, Value};

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Register the push token notifications are sent to, replacing the previous one.
#[tracing::instrument(skip(state, token), fields(client_id = %token.client_id))]
pub async fn register_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(token): ValidatedJson<MessagingToken>,
) -> Result<Json<Value>, HttpAppError> {
    if token.token.trim().is_empty() {
        return Err(AppError::InvalidInput("token must not be empty".to_string()).into());
    }

    state.repos.tokens.set(&token).await?;
    tracing::info!("Messaging token registered");
    Ok(Json(json!({ "status": "ok" })))
}
