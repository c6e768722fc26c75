//! Upload task dispatch
//!
//! Every accepted upload becomes one [`UploadTask`](proteggo_core::models::UploadTask)
//! handed to a [`TaskDispatcher`]. Two backends exist: Google Cloud Tasks, which posts
//! each task back to the service over HTTP, and an in-process queue with its own worker
//! pool and retry policy.

pub mod cloud_tasks;
pub mod context;
pub mod dispatcher;
pub mod queue;
pub mod signing;

pub use cloud_tasks::CloudTasksDispatcher;
pub use context::{empty_context_weak, TaskHandlerContext};
pub use dispatcher::{DispatchError, TaskDispatcher, TaskHandle};
pub use queue::{InProcessTaskQueue, TaskQueueConfig, MAX_RETRY_BACKOFF_SECS};
pub use signing::{SignatureError, TaskSigner, MAX_SIGNATURE_AGE_SECS};
