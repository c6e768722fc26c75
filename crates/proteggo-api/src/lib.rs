//! Proteggo API Library
//!
//! This crate provides the HTTP handlers, the image processing pipeline and application setup.

pub mod constants;
pub mod error;
mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod task_handlers;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, Collaborators, Repositories};
pub use task_handlers::{ImageProcessingResult, ImageProcessingTaskHandler, PipelineOutcome};
