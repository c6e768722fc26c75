//! In-process task queue: a channel, a bounded worker pool, per-task deadline and
//! retry with capped exponential backoff.
//!
//! Shutdown: [`InProcessTaskQueue::shutdown`] stops the pool from taking new tasks; it
//! does not wait for in-flight tasks.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};
use uuid::Uuid;

use proteggo_core::models::UploadTask;
use proteggo_core::{Config, TaskError};

use crate::context::TaskHandlerContext;
use crate::dispatcher::{DispatchError, TaskDispatcher, TaskHandle};

/// Maximum delay in seconds before retrying a failed task.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Backoff in seconds for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: u32) -> u64 {
    2_u64
        .checked_pow(retry_count)
        .unwrap_or(u64::MAX)
        .min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone, Debug)]
pub struct TaskQueueConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub timeout: Duration,
    /// Length of one backoff "second"; shortened in tests.
    pub backoff_unit: Duration,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_retries: 5,
            timeout: Duration::from_secs(300),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl TaskQueueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.task_queue_max_workers().max(1),
            max_retries: config.task_queue_max_retries(),
            timeout: Duration::from_secs(config.task_timeout_secs()),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
struct QueuedTask {
    handle: String,
    task: UploadTask,
    retry_count: u32,
}

/// Queue whose worker pool runs tasks against a [`TaskHandlerContext`].
///
/// Created idle so it can be stored in application state; [`start`](Self::start)
/// spawns the pool once the context exists.
pub struct InProcessTaskQueue {
    config: TaskQueueConfig,
    sender: mpsc::UnboundedSender<QueuedTask>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<QueuedTask>>>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<Option<mpsc::Receiver<()>>>,
}

impl InProcessTaskQueue {
    pub fn new(config: TaskQueueConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Self {
            config,
            sender,
            receiver: Mutex::new(Some(receiver)),
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
        }
    }

    /// Spawn the worker pool. Calling it a second time is a no-op.
    pub async fn start(&self, context: Weak<dyn TaskHandlerContext>) {
        let (Some(receiver), Some(shutdown_rx)) = (
            self.receiver.lock().await.take(),
            self.shutdown_rx.lock().await.take(),
        ) else {
            tracing::warn!("Task queue worker pool already started");
            return;
        };

        let config = self.config.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            Self::worker_pool(config, context, receiver, sender, shutdown_rx).await;
        });
    }

    async fn worker_pool(
        config: TaskQueueConfig,
        context: Weak<dyn TaskHandlerContext>,
        mut receiver: mpsc::UnboundedReceiver<QueuedTask>,
        sender: mpsc::UnboundedSender<QueuedTask>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            max_workers = config.max_workers,
            max_retries = config.max_retries,
            timeout_secs = config.timeout.as_secs(),
            "Task queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));

        loop {
            let queued = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Task queue worker pool shutting down");
                    break;
                }
                queued = receiver.recv() => match queued {
                    Some(queued) => queued,
                    None => break,
                },
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let ctx = context.clone();
            let sender = sender.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let _permit = permit;
                Self::process_task_with_retry(queued, ctx, sender, config).await;
            });
        }

        tracing::info!("Task queue worker pool stopped");
    }

    #[tracing::instrument(skip_all, fields(task.id = %queued.handle, image_id = %queued.task.id, retry_count = queued.retry_count))]
    async fn process_task_with_retry(
        queued: QueuedTask,
        context: Weak<dyn TaskHandlerContext>,
        sender: mpsc::UnboundedSender<QueuedTask>,
        config: TaskQueueConfig,
    ) {
        let Some(ctx) = context.upgrade() else {
            tracing::error!("TaskHandlerContext was dropped, cannot process task");
            return;
        };

        let result = tokio::time::timeout(config.timeout, ctx.handle_upload_task(&queued.task)).await;

        let error: anyhow::Error = match result {
            Ok(Ok(outcome)) => {
                tracing::info!(outcome = %outcome, "Task completed successfully");
                return;
            }
            Ok(Err(e)) => e,
            Err(_) => {
                tracing::error!(timeout_secs = config.timeout.as_secs(), "Task execution timed out");
                anyhow::anyhow!("Task execution timed out")
            }
        };

        let is_unrecoverable = error
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);

        tracing::error!(
            error = %error,
            max_retries = config.max_retries,
            unrecoverable = is_unrecoverable,
            "Task execution failed"
        );

        if is_unrecoverable {
            tracing::error!("Task failed with unrecoverable error, will not retry");
            return;
        }

        if queued.retry_count >= config.max_retries {
            tracing::error!("Task failed after max retries");
            return;
        }

        let backoff_seconds = compute_retry_backoff_seconds(queued.retry_count);
        let delay = config.backoff_unit.saturating_mul(backoff_seconds as u32);
        tracing::info!(
            retry_count = queued.retry_count + 1,
            backoff_seconds = backoff_seconds,
            "Scheduling task retry"
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let retry = QueuedTask {
                retry_count: queued.retry_count + 1,
                ..queued
            };
            if sender.send(retry).is_err() {
                tracing::warn!("Task queue closed before retry could be scheduled");
            }
        });
    }

    /// Signals the worker pool to stop taking tasks.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating task queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[async_trait]
impl TaskDispatcher for InProcessTaskQueue {
    async fn enqueue(&self, task: &UploadTask) -> Result<TaskHandle, DispatchError> {
        let handle = Uuid::new_v4().to_string();
        self.sender
            .send(QueuedTask {
                handle: handle.clone(),
                task: task.clone(),
                retry_count: 0,
            })
            .map_err(|_| DispatchError::Closed)?;

        tracing::debug!(task_id = %handle, image_id = %task.id, "Task submitted to queue");
        Ok(TaskHandle(handle))
    }

    fn backend_name(&self) -> &'static str {
        "in-process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(70), MAX_RETRY_BACKOFF_SECS);
    }

    /// Fails the first `failures` attempts with the configured error kind.
    struct FlakyContext {
        attempts: AtomicU32,
        failures: u32,
        recoverable: bool,
        done: mpsc::UnboundedSender<u32>,
    }

    #[async_trait]
    impl TaskHandlerContext for FlakyContext {
        async fn handle_upload_task(
            self: Arc<Self>,
            _task: &UploadTask,
        ) -> Result<serde_json::Value> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.done.send(attempt);
            if attempt <= self.failures {
                let err = anyhow::anyhow!("attempt {} failed", attempt);
                return Err(if self.recoverable {
                    TaskError::recoverable(err).into()
                } else {
                    TaskError::unrecoverable(err).into()
                });
            }
            Ok(serde_json::json!({"status": "ok"}))
        }
    }

    fn fast_config(max_retries: u32) -> TaskQueueConfig {
        TaskQueueConfig {
            max_workers: 2,
            max_retries,
            timeout: Duration::from_secs(5),
            backoff_unit: Duration::from_millis(1),
        }
    }

    async fn attempts_after_run(failures: u32, recoverable: bool, max_retries: u32) -> u32 {
        let (done, mut attempts_rx) = mpsc::unbounded_channel();
        let context = Arc::new(FlakyContext {
            attempts: AtomicU32::new(0),
            failures,
            recoverable,
            done,
        });
        let dyn_context: Arc<dyn TaskHandlerContext> = context.clone();

        let queue = InProcessTaskQueue::new(fast_config(max_retries));
        queue.start(Arc::downgrade(&dyn_context)).await;
        queue
            .enqueue(&UploadTask::new("img-1", "_temp/a.jpg", 1))
            .await
            .unwrap();

        let mut last = 0;
        while let Ok(Some(attempt)) =
            tokio::time::timeout(Duration::from_millis(300), attempts_rx.recv()).await
        {
            last = attempt;
        }
        queue.shutdown().await;
        last
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        assert_eq!(attempts_after_run(2, true, 5).await, 3);
    }

    #[tokio::test]
    async fn retries_stop_at_budget() {
        assert_eq!(attempts_after_run(10, true, 2).await, 3);
    }

    #[tokio::test]
    async fn unrecoverable_failure_is_not_retried() {
        assert_eq!(attempts_after_run(10, false, 5).await, 1);
    }

    #[test]
    fn non_task_error_treated_as_recoverable() {
        let err: anyhow::Error = anyhow::anyhow!("generic error");
        let is_unrecoverable = err
            .downcast_ref::<TaskError>()
            .map(|te| !te.is_recoverable())
            .unwrap_or(false);
        assert!(!is_unrecoverable);
    }
}
