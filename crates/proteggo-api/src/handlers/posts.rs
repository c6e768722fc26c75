use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use proteggo_core::models::{timestamp, PostRecord};
use proteggo_core::AppError;
use serde_json::{json, Map, Value};

use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Store a post and link every referenced image and face to it.
///
/// The creation time is assigned here; a `createdAt` sent by the client is ignored.
#[tracing::instrument(skip(state, body))]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    ValidatedJson(mut body): ValidatedJson<Map<String, Value>>,
) -> Result<Json<Value>, HttpAppError> {
    body.insert(
        "createdAt".to_string(),
        Value::String(timestamp::format(&Utc::now())),
    );
    let post: PostRecord = serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::InvalidInput(format!("Invalid post: {}", e)))?;
    state.validator.validate_image_id(&post.id)?;

    state.repos.posts.save(&post).await?;

    for image_id in &post.images_ids {
        if state.repos.images.get(image_id).await?.is_none() {
            tracing::warn!(post_id = %post.id, image_id = %image_id, "Post references unknown image");
            continue;
        }
        state.repos.images.set_post_id(image_id, &post.id).await?;

        for face_id in post.faces_ids.get(image_id).into_iter().flatten() {
            if state.repos.faces.get(face_id).await?.is_none() {
                tracing::warn!(post_id = %post.id, face_id = %face_id, "Post references unknown face");
                continue;
            }
            state.repos.faces.set_post_id(face_id, &post.id).await?;
        }
    }

    tracing::info!(
        post_id = %post.id,
        image_count = post.images_ids.len(),
        "Post created"
    );
    Ok(Json(json!({ "status": "ok", "postId": post.id })))
}
