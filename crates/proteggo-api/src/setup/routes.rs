//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use proteggo_core::constants::IMAGE_PROCESSING_TASK_PATH;
use proteggo_core::Config;
use proteggo_infra::request_id_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::constants::{
    FACES_OVERLAY_PATH, FACES_PATH, FILES_PATH, IMAGES_PATH, IMAGES_TEMP_PATH, IMAGES_UNUSED_PATH,
    MAX_FILES_PER_UPLOAD, MESSAGING_PATH, OBSCURED_OVERLAY_PATH, OBSCURED_OVERLAY_TEMP_PATH,
    POSTS_PATH,
};
use crate::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Oversized files must reach the upload validator so they are reported per file,
    // so the transport limit admits a full batch of maximum-size files.
    let body_limit = config
        .max_upload_size_bytes()
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(
            IMAGES_PATH,
            post(handlers::images::upload_images)
                .get(handlers::images::list_images)
                .delete(handlers::images::delete_images),
        )
        .route(
            IMAGES_TEMP_PATH,
            axum::routing::delete(handlers::images::purge_temp),
        )
        .route(
            IMAGES_UNUSED_PATH,
            axum::routing::delete(handlers::images::delete_unused),
        )
        .route(FACES_PATH, axum::routing::delete(handlers::faces::delete_faces))
        .route(
            FACES_OVERLAY_PATH,
            get(handlers::faces::get_faces_overlay).delete(handlers::faces::delete_faces_overlays),
        )
        .route(
            OBSCURED_OVERLAY_PATH,
            post(handlers::faces::confirm_obscured_overlays)
                .delete(handlers::faces::delete_obscured_overlays),
        )
        .route(
            OBSCURED_OVERLAY_TEMP_PATH,
            post(handlers::faces::create_temp_obscured_overlay),
        )
        .route(POSTS_PATH, post(handlers::posts::create_post))
        .route(MESSAGING_PATH, post(handlers::messaging::register_token))
        .route(
            IMAGE_PROCESSING_TASK_PATH,
            post(handlers::tasks::process_upload_task),
        )
        .route(FILES_PATH, get(handlers::files::download_object))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
