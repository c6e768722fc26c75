//! Application state.
//!
//! Every external collaborator is constructed once at startup and passed in through
//! [`Collaborators`], so tests assemble the same state with fakes.

use std::sync::Arc;

use async_trait::async_trait;
use proteggo_core::models::UploadTask;
use proteggo_core::Config;
use proteggo_db::{
    DocumentStore, FaceRepository, ImageRepository, MessagingTokenRepository, PostRepository,
};
use proteggo_detection::FaceDetector;
use proteggo_infra::{NotificationDispatcher, PushSender};
use proteggo_processing::UploadValidator;
use proteggo_storage::{DeliveryUrlBuilder, ObjectPublisher, Storage};
use proteggo_worker::{InProcessTaskQueue, TaskDispatcher, TaskHandlerContext, TaskSigner};

use crate::task_handlers::ImageProcessingTaskHandler;

/// External services the application talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<dyn DocumentStore>,
    pub detector: Arc<dyn FaceDetector>,
    pub push: Arc<dyn PushSender>,
    pub dispatcher: Arc<dyn TaskDispatcher>,
}

/// Typed repositories over the shared document store.
#[derive(Clone)]
pub struct Repositories {
    pub images: ImageRepository,
    pub faces: FaceRepository,
    pub posts: PostRepository,
    pub tokens: MessagingTokenRepository,
}

impl Repositories {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            images: ImageRepository::new(documents.clone()),
            faces: FaceRepository::new(documents.clone()),
            posts: PostRepository::new(documents.clone()),
            tokens: MessagingTokenRepository::new(documents),
        }
    }
}

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub publisher: ObjectPublisher,
    pub repos: Repositories,
    pub detector: Arc<dyn FaceDetector>,
    pub notifier: NotificationDispatcher,
    pub dispatcher: Arc<dyn TaskDispatcher>,
    pub validator: UploadValidator,
    /// Verifies task requests when `TASK_SIGNING_SECRET` is set.
    pub task_signer: Option<TaskSigner>,
    pub image_processing: ImageProcessingTaskHandler,
    /// Present when tasks run in this process; stopped on shutdown.
    pub task_queue: Option<Arc<InProcessTaskQueue>>,
}

impl AppState {
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self, anyhow::Error> {
        let Collaborators {
            storage,
            documents,
            detector,
            push,
            dispatcher,
        } = collaborators;

        let task_signer = config
            .task_signing_secret()
            .map(TaskSigner::new)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid TASK_SIGNING_SECRET: {}", e))?;

        let publisher = ObjectPublisher::new(
            storage.clone(),
            DeliveryUrlBuilder::new(config.storage_host(), config.storage_bucket()),
        );
        let repos = Repositories::new(documents);
        let notifier = NotificationDispatcher::new(repos.tokens.clone(), push);
        let validator = UploadValidator::new(config.max_upload_size_bytes());
        let image_processing = ImageProcessingTaskHandler::from_config(&config);

        Ok(Self {
            config,
            storage,
            publisher,
            repos,
            detector,
            notifier,
            dispatcher,
            validator,
            task_signer,
            image_processing,
            task_queue: None,
        })
    }

    pub fn with_task_queue(mut self, queue: Arc<InProcessTaskQueue>) -> Self {
        self.task_queue = Some(queue);
        self
    }

    pub async fn shutdown(&self) {
        if let Some(queue) = &self.task_queue {
            queue.shutdown().await;
        }
    }
}

/// The in-process queue runs the same pipeline as the task endpoint.
#[async_trait]
impl TaskHandlerContext for AppState {
    async fn handle_upload_task(
        self: Arc<Self>,
        task: &UploadTask,
    ) -> Result<serde_json::Value, anyhow::Error> {
        let result = self.image_processing.process(&self, task).await?;
        Ok(result.to_json())
    }
}
