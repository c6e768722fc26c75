use async_trait::async_trait;

use crate::error::DocumentResult;
use crate::query::{Document, Fields, Query};

/// Document store abstraction.
///
/// Writes are last-writer-wins per (collection, id); there is no optimistic
/// concurrency check.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> DocumentResult<Option<Fields>>;

    /// Create or fully replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()>;

    /// Merge `fields` into a document, creating it when absent. Top-level keys in
    /// `fields` overwrite, other keys are kept.
    async fn merge_update(&self, collection: &str, id: &str, fields: Fields) -> DocumentResult<()>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> DocumentResult<()>;

    /// Run a query. An unknown `start_after` id is `DocumentError::NotFound`.
    async fn query(&self, collection: &str, query: &Query) -> DocumentResult<Vec<Document>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
