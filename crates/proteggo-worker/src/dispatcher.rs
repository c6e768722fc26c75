use async_trait::async_trait;
use proteggo_core::models::UploadTask;
use std::fmt;

/// Opaque identifier the backend assigned to an enqueued task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle(pub String);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Task queue is not configured: {0}")]
    NotConfigured(String),

    #[error("Task queue request failed: {0}")]
    Request(String),

    #[error("Task queue rejected the task ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Task queue is shut down")]
    Closed,
}

impl DispatchError {
    pub fn is_transient(&self) -> bool {
        match self {
            DispatchError::Request(_) => true,
            DispatchError::Rejected { status, .. } => *status == 429 || *status >= 500,
            DispatchError::NotConfigured(_) | DispatchError::Encode(_) | DispatchError::Closed => {
                false
            }
        }
    }
}

/// Hands one upload task to the queue. Delivery is at-least-once.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn enqueue(&self, task: &UploadTask) -> Result<TaskHandle, DispatchError>;

    fn backend_name(&self) -> &'static str;
}
