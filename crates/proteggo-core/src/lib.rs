//! Proteggo Core Library
//!
//! This crate provides core domain models, error types, configuration and storage
//! layout constants shared across all Proteggo components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod task_error;

// Re-export commonly used types
pub use config::{Config, DocumentStoreBackend, ServiceConfig, TaskQueueBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use task_error::{TaskError, TaskResultExt};
