//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs on the local storage backend in a temp directory and the in-memory
//! document store. Detection, push delivery and task dispatch are scripted fakes
//! injected through [`Collaborators`], the same seam production uses.
//!
//! Run from workspace root: `cargo test -p proteggo-api`.

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

use std::sync::Arc;

use axum_test::TestServer;
use proteggo_api::setup::routes;
use proteggo_api::state::{AppState, Collaborators};
use proteggo_core::models::{MessagingToken, UploadTask};
use proteggo_core::{Config, ServiceConfig};
use proteggo_db::{DocumentStore, MemoryDocumentStore};
use proteggo_storage::{LocalStorage, Storage};
use tempfile::TempDir;

use fakes::{FailingDeleteStorage, FakeDetector, RecordingDispatcher, RecordingPushSender};

pub const TEST_SIGNING_SECRET: &str = "test-task-signing-secret";
pub const TEST_PUSH_TOKEN: &str = "device-token-1";

/// Knobs for one test app.
#[derive(Default)]
pub struct TestOptions {
    /// Require signed task requests.
    pub signing_secret: Option<String>,
    /// Every enqueue fails.
    pub failing_dispatcher: bool,
    /// Deleting any key under this prefix fails.
    pub failing_delete_prefix: Option<String>,
    /// Leave the push registration token unset.
    pub without_push_token: bool,
}

/// Test application: server, state, fakes, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage: Arc<dyn Storage>,
    pub documents: Arc<MemoryDocumentStore>,
    pub detector: Arc<FakeDetector>,
    pub push: Arc<RecordingPushSender>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Tasks enqueued so far, in order.
    pub fn enqueued(&self) -> Vec<UploadTask> {
        self.dispatcher.tasks()
    }

    /// Put raw bytes under a temp key and return the task a successful upload would enqueue.
    pub async fn stage_upload(&self, image_id: &str, data: Vec<u8>) -> UploadTask {
        let key = format!("_temp/{}-raw.jpg", image_id);
        self.storage
            .put(&key, data, "image/jpeg")
            .await
            .expect("Failed to stage upload");
        UploadTask::new(image_id, key, 1)
    }

    /// Run the pipeline through the task endpoint and return the response body.
    pub async fn run_task(&self, task: &UploadTask) -> axum_test::TestResponse {
        self.server
            .post(proteggo_core::constants::IMAGE_PROCESSING_TASK_PATH)
            .json(task)
            .await
    }
}

pub fn create_test_config(storage_path: &str, options: &TestOptions) -> Config {
    Config::from(ServiceConfig {
        local_storage_path: storage_path.to_string(),
        task_signing_secret: options.signing_secret.clone(),
        ..ServiceConfig::default()
    })
}

/// Setup a test app with default options.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = temp_dir.path().to_string_lossy().to_string();
    let config = create_test_config(&storage_path, &options);

    let local: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let storage: Arc<dyn Storage> = match &options.failing_delete_prefix {
        Some(prefix) => Arc::new(FailingDeleteStorage::new(local, prefix)),
        None => local,
    };

    let documents = Arc::new(MemoryDocumentStore::new());
    let detector = Arc::new(FakeDetector::default());
    let push = Arc::new(RecordingPushSender::default());
    let dispatcher = Arc::new(if options.failing_dispatcher {
        RecordingDispatcher::failing()
    } else {
        RecordingDispatcher::default()
    });

    let collaborators = Collaborators {
        storage: storage.clone(),
        documents: documents.clone() as Arc<dyn DocumentStore>,
        detector: detector.clone(),
        push: push.clone(),
        dispatcher: dispatcher.clone(),
    };
    let state = Arc::new(
        AppState::new(config.clone(), collaborators).expect("Failed to build app state"),
    );

    if !options.without_push_token {
        state
            .repos
            .tokens
            .set(&MessagingToken {
                client_id: "client-1".to_string(),
                token: TEST_PUSH_TOKEN.to_string(),
            })
            .await
            .expect("Failed to register push token");
    }

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to setup routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        storage,
        documents,
        detector,
        push,
        dispatcher,
        _temp_dir: temp_dir,
    }
}
