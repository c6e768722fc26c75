//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object store backends implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::UploadFailed(_)
                | StorageError::DownloadFailed(_)
                | StorageError::DeleteFailed(_)
                | StorageError::BackendError(_)
                | StorageError::IoError(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata kept alongside every object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub content_type: String,
    pub size_bytes: u64,
    /// Token that authorises delivery URLs; `None` until one has been minted.
    pub download_token: Option<String>,
}

/// Storage abstraction trait
///
/// Keys are bucket-relative paths such as `faces/<imageId>_0.jpg`. See the crate root
/// documentation for the folder layout.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a whole object.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Write a whole object, replacing any previous content and metadata.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Copy an object (content and metadata) to another key.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// List every key starting with `prefix`, in lexical order.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Read object metadata.
    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata>;

    /// Replace the download token stored with an object.
    async fn set_download_token(&self, key: &str, token: &str) -> StorageResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Move an object: copy then delete the source. Not atomic; a failed delete leaves
    /// both copies behind.
    async fn move_object(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.copy(from_key, to_key).await?;
        self.delete(from_key).await
    }

    /// Download token of an object, if one has been minted.
    async fn download_token(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.metadata(key).await?.download_token)
    }
}
