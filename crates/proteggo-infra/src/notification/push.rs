use async_trait::async_trait;
use proteggo_core::Config;
use serde_json::json;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use super::error::NotificationError;

const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";

/// Push transport: delivers a data-only message to one device token.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        token: &str,
        data: HashMap<String, String>,
    ) -> Result<(), NotificationError>;
}

/// Firebase Cloud Messaging HTTP v1 sender.
pub struct FcmPushSender {
    http_client: reqwest::Client,
    project_id: Option<String>,
    access_token: Option<String>,
    api_base: String,
}

impl Debug for FcmPushSender {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FcmPushSender")
            .field("project_id", &self.project_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl FcmPushSender {
    pub fn new(
        project_id: Option<String>,
        access_token: Option<String>,
    ) -> Result<Self, NotificationError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotificationError::Delivery(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            project_id,
            access_token,
            api_base: FCM_API_BASE.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, NotificationError> {
        if config.push_project_id().is_none() {
            tracing::warn!("PUSH_PROJECT_ID not set; client notifications will fail");
        }
        Self::new(
            config.push_project_id().map(str::to_string),
            config.push_access_token().map(str::to_string),
        )
    }

    /// Point the sender at a different API root (emulators, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self, project_id: &str) -> String {
        format!(
            "{}/projects/{}/messages:send",
            self.api_base.trim_end_matches('/'),
            project_id
        )
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send(
        &self,
        token: &str,
        data: HashMap<String, String>,
    ) -> Result<(), NotificationError> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or_else(|| NotificationError::NotConfigured("PUSH_PROJECT_ID".to_string()))?;

        let mut request = self.http_client.post(self.endpoint(project_id)).json(&json!({
            "message": {
                "token": token,
                "data": data,
            }
        }));
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::Delivery(format!("{} - {}", status, body)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_project() {
        let sender = FcmPushSender::new(Some("demo".into()), None)
            .unwrap()
            .with_api_base("http://localhost:9099/v1/");
        assert_eq!(
            sender.endpoint("demo"),
            "http://localhost:9099/v1/projects/demo/messages:send"
        );
    }

    #[tokio::test]
    async fn test_missing_project_is_not_configured() {
        let sender = FcmPushSender::new(None, None).unwrap();
        let result = sender.send("token", HashMap::new()).await;
        assert!(matches!(result, Err(NotificationError::NotConfigured(_))));
    }
}
