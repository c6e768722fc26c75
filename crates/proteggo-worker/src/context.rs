//! Task handler context trait
//!
//! The API implements this trait for its application state. The in-process queue
//! calls `handle_upload_task` for every task it pulls off its channel.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

use proteggo_core::models::UploadTask;

/// Context for task execution.
///
/// The queue holds a weak reference so that application state can own the queue.
/// A failed task signals "do not retry" by returning a
/// [`TaskError`](proteggo_core::TaskError) marked unrecoverable.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    async fn handle_upload_task(self: Arc<Self>, task: &UploadTask) -> Result<serde_json::Value>;
}

/// Placeholder used before the real context exists. Every task fails.
struct NoopContext;

#[async_trait]
impl TaskHandlerContext for NoopContext {
    async fn handle_upload_task(self: Arc<Self>, _task: &UploadTask) -> Result<serde_json::Value> {
        Err(anyhow!("NoopContext: no handler context available"))
    }
}

/// Returns a weak reference to a no-op context.
pub fn empty_context_weak() -> Weak<dyn TaskHandlerContext> {
    let n: Arc<dyn TaskHandlerContext> = Arc::new(NoopContext);
    Arc::downgrade(&n)
}
