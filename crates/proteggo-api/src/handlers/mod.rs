pub mod faces;
pub mod files;
pub mod images;
pub mod messaging;
pub mod posts;
pub mod tasks;

use axum::Json;
use serde_json::{json, Value};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}
