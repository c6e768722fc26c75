//! Google Cloud Tasks REST dispatcher.
//!
//! Each upload becomes an HTTP task that the queue POSTs back to the service's
//! task endpoint, retrying with the queue's own backoff until it answers 2xx
//! (or a non-retryable status).

use async_trait::async_trait;
use base64::Engine;
use proteggo_core::constants::{IMAGE_PROCESSING_TASK_PATH, TASK_SIGNATURE_HEADER};
use proteggo_core::models::UploadTask;
use proteggo_core::Config;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use crate::dispatcher::{DispatchError, TaskDispatcher, TaskHandle};
use crate::signing::TaskSigner;

const CLOUD_TASKS_API_BASE: &str = "https://cloudtasks.googleapis.com/v2";

pub struct CloudTasksDispatcher {
    http_client: reqwest::Client,
    queue_path: String,
    access_token: String,
    target_url: String,
    signer: Option<TaskSigner>,
    api_base: String,
}

impl CloudTasksDispatcher {
    pub fn new(
        queue_path: impl Into<String>,
        access_token: impl Into<String>,
        service_url: &str,
        signer: Option<TaskSigner>,
    ) -> Result<Self, DispatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DispatchError::Request(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            queue_path: queue_path.into(),
            access_token: access_token.into(),
            target_url: format!(
                "{}{}",
                service_url.trim_end_matches('/'),
                IMAGE_PROCESSING_TASK_PATH
            ),
            signer,
            api_base: CLOUD_TASKS_API_BASE.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let queue_path = config
            .task_queue_path()
            .ok_or_else(|| DispatchError::NotConfigured("TASK_QUEUE_PATH".to_string()))?;
        let access_token = config
            .task_queue_access_token()
            .ok_or_else(|| DispatchError::NotConfigured("TASK_QUEUE_ACCESS_TOKEN".to_string()))?;
        let signer = config
            .task_signing_secret()
            .map(TaskSigner::new)
            .transpose()
            .map_err(|e| DispatchError::NotConfigured(e.to_string()))?;

        Self::new(queue_path, access_token, config.service_url(), signer)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Request body for `projects.locations.queues.tasks.create`.
    fn create_task_body(&self, payload: &[u8]) -> serde_json::Value {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(signer) = &self.signer {
            headers.insert(TASK_SIGNATURE_HEADER.to_string(), signer.sign(payload));
        }

        json!({
            "task": {
                "httpRequest": {
                    "httpMethod": "POST",
                    "url": self.target_url,
                    "headers": headers,
                    "body": base64::engine::general_purpose::STANDARD.encode(payload),
                }
            }
        })
    }
}

#[async_trait]
impl TaskDispatcher for CloudTasksDispatcher {
    #[tracing::instrument(skip(self, task), fields(image_id = %task.id))]
    async fn enqueue(&self, task: &UploadTask) -> Result<TaskHandle, DispatchError> {
        let payload = serde_json::to_vec(task)?;
        let url = format!(
            "{}/{}/tasks",
            self.api_base.trim_end_matches('/'),
            self.queue_path
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&self.create_task_body(&payload))
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let created: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DispatchError::Request(e.to_string()))?;
        let name = created
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string();

        tracing::info!(task_name = %name, "Upload task created");
        Ok(TaskHandle(name))
    }

    fn backend_name(&self) -> &'static str {
        "cloud-tasks"
    }
}
