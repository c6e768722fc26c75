//! Scripted collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proteggo_core::models::{NotificationPayload, UploadTask};
use proteggo_detection::{DetectedFace, DetectionError, FaceDetector};
use proteggo_infra::{NotificationError, PushSender};
use proteggo_storage::{ObjectMetadata, Storage, StorageError, StorageResult};
use proteggo_worker::{DispatchError, TaskDispatcher, TaskHandle};

/// What the next detection call returns.
#[derive(Debug, Clone)]
pub enum DetectorScript {
    Faces(Vec<DetectedFace>),
    /// The service answers 503.
    Unavailable,
    /// The service answers with something unparseable.
    Garbage,
}

pub struct FakeDetector {
    script: Mutex<DetectorScript>,
    calls: Mutex<usize>,
}

impl Default for FakeDetector {
    fn default() -> Self {
        Self {
            script: Mutex::new(DetectorScript::Faces(Vec::new())),
            calls: Mutex::new(0),
        }
    }
}

impl FakeDetector {
    pub fn script(&self, script: DetectorScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn returns(&self, faces: Vec<DetectedFace>) {
        self.script(DetectorScript::Faces(faces));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl FaceDetector for FakeDetector {
    async fn detect(
        &self,
        _image: &[u8],
        max_results: u32,
    ) -> Result<Vec<DetectedFace>, DetectionError> {
        *self.calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().clone() {
            DetectorScript::Faces(mut faces) => {
                faces.truncate(max_results as usize);
                Ok(faces)
            }
            DetectorScript::Unavailable => Err(DetectionError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            }),
            DetectorScript::Garbage => Err(DetectionError::InvalidResponse(
                "missing responses".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<(String, HashMap<String, String>)>>,
}

impl RecordingPushSender {
    /// Decoded payloads, in delivery order.
    pub fn payloads(&self) -> Vec<NotificationPayload> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| {
                serde_json::from_str(data.get("data").expect("payload under `data`"))
                    .expect("payload decodes")
            })
            .collect()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(token, _)| token.clone())
            .collect()
    }
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send(
        &self,
        token: &str,
        data: HashMap<String, String>,
    ) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((token.to_string(), data));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    tasks: Mutex<Vec<UploadTask>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn tasks(&self) -> Vec<UploadTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn enqueue(&self, task: &UploadTask) -> Result<TaskHandle, DispatchError> {
        if self.fail {
            return Err(DispatchError::Request("queue unreachable".to_string()));
        }
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(task.clone());
        Ok(TaskHandle(format!("task-{}", tasks.len())))
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Local storage whose deletes fail under one prefix.
pub struct FailingDeleteStorage {
    inner: Arc<dyn Storage>,
    prefix: String,
}

impl FailingDeleteStorage {
    pub fn new(inner: Arc<dyn Storage>, prefix: &str) -> Self {
        Self {
            inner,
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl Storage for FailingDeleteStorage {
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.inner.put(key, data, content_type).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if key.starts_with(&self.prefix) {
            return Err(StorageError::DeleteFailed(format!("{}: permission denied", key)));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        self.inner.copy(from_key, to_key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(prefix).await
    }

    async fn metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        self.inner.metadata(key).await
    }

    async fn set_download_token(&self, key: &str, token: &str) -> StorageResult<()> {
        self.inner.set_download_token(key, token).await
    }

    fn backend_name(&self) -> &'static str {
        "failing-delete"
    }
}
