//! Construction of the external collaborators and the application state.

use std::sync::{Arc, Weak};

use anyhow::{Context, Result};
use proteggo_core::{Config, TaskQueueBackend};
use proteggo_detection::{FaceDetector, GoogleVisionDetector};
use proteggo_infra::{FcmPushSender, PushSender};
use proteggo_worker::{
    CloudTasksDispatcher, InProcessTaskQueue, TaskDispatcher, TaskHandlerContext, TaskQueueConfig,
};

use crate::state::{AppState, Collaborators};

/// Build every collaborator from configuration and assemble the state.
///
/// With the in-process task backend the queue's workers are started here, once the
/// state they run against exists.
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = proteggo_storage::create_storage(config)
        .await
        .context("Failed to initialize object storage")?;
    let documents = proteggo_db::create_document_store(config)
        .await
        .context("Failed to initialize document store")?;

    let detector: Arc<dyn FaceDetector> = Arc::new(
        GoogleVisionDetector::from_config(config).context("Failed to build face detector")?,
    );
    let push: Arc<dyn PushSender> =
        Arc::new(FcmPushSender::from_config(config).context("Failed to build push sender")?);

    let (dispatcher, queue): (Arc<dyn TaskDispatcher>, Option<Arc<InProcessTaskQueue>>) =
        match config.task_queue_backend() {
            TaskQueueBackend::CloudTasks => {
                let dispatcher = CloudTasksDispatcher::from_config(config)
                    .context("Failed to build Cloud Tasks dispatcher")?;
                tracing::info!(target_url = %dispatcher.target_url(), "Using Cloud Tasks dispatcher");
                let dispatcher: Arc<dyn TaskDispatcher> = Arc::new(dispatcher);
                (dispatcher, None)
            }
            TaskQueueBackend::InProcess => {
                let queue = Arc::new(InProcessTaskQueue::new(TaskQueueConfig::from_config(config)));
                tracing::info!("Using in-process task queue");
                let dispatcher: Arc<dyn TaskDispatcher> = queue.clone();
                (dispatcher, Some(queue))
            }
        };

    let collaborators = Collaborators {
        storage,
        documents,
        detector,
        push,
        dispatcher,
    };

    let mut state = AppState::new(config.clone(), collaborators)?;
    if let Some(queue) = &queue {
        state = state.with_task_queue(queue.clone());
    }
    let state = Arc::new(state);

    if let Some(queue) = queue {
        let context: Arc<dyn TaskHandlerContext> = state.clone();
        let weak: Weak<dyn TaskHandlerContext> = Arc::downgrade(&context);
        queue.start(weak).await;
    }

    tracing::info!(
        storage = state.storage.backend_name(),
        dispatcher = state.dispatcher.backend_name(),
        detector = state.detector.name(),
        task_signing = state.task_signer.is_some(),
        "Services initialized"
    );

    Ok(state)
}
