use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use proteggo_core::models::FacesOverlay;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{HttpAppError, ValidatedJson};
use crate::services::{
    ConfirmObscuredOutcome, ConfirmObscuredRequest, DeleteFacesRequest, DeleteOutcome,
    ImagesIdsRequest, OverlayService, TempObscuredOverlayRequest,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayQuery {
    image_id: String,
}

/// Render a temp preview with the selected faces obscured.
#[tracing::instrument(skip(state, request))]
pub async fn create_temp_obscured_overlay(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<TempObscuredOverlayRequest>,
) -> Result<Json<Value>, HttpAppError> {
    let overlay = OverlayService::new(&state)
        .create_temp_obscured(request)
        .await?;
    Ok(Json(json!({ "obscuredOverlay": overlay })))
}

/// Promote confirmed previews to permanent obscured overlays.
#[tracing::instrument(skip(state, request))]
pub async fn confirm_obscured_overlays(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ConfirmObscuredRequest>,
) -> Result<Json<ConfirmObscuredOutcome>, HttpAppError> {
    let outcome = OverlayService::new(&state).confirm_obscured(request).await?;
    Ok(Json(outcome))
}

#[tracing::instrument(skip(state))]
pub async fn get_faces_overlay(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OverlayQuery>,
) -> Result<Json<FacesOverlay>, HttpAppError> {
    let overlay = OverlayService::new(&state)
        .faces_overlay(&query.image_id)
        .await?;
    Ok(Json(overlay))
}

#[tracing::instrument(skip(state, request))]
pub async fn delete_faces(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<DeleteFacesRequest>,
) -> Result<Json<DeleteOutcome>, HttpAppError> {
    Ok(Json(OverlayService::new(&state).delete_faces(request).await))
}

#[tracing::instrument(skip(state, request))]
pub async fn delete_faces_overlays(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ImagesIdsRequest>,
) -> Result<Json<DeleteOutcome>, HttpAppError> {
    Ok(Json(
        OverlayService::new(&state)
            .delete_faces_overlays(request)
            .await,
    ))
}

#[tracing::instrument(skip(state, request))]
pub async fn delete_obscured_overlays(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ImagesIdsRequest>,
) -> Result<Json<DeleteOutcome>, HttpAppError> {
    Ok(Json(
        OverlayService::new(&state)
            .delete_obscured_overlays(request)
            .await,
    ))
}
