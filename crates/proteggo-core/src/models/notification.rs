use serde::{Deserialize, Serialize};

use super::FaceReference;

/// Payload pushed to the registered client once an image has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub image_id: String,
    pub image_url: String,
    pub image_storage_path: String,
    pub faces_ids: Vec<String>,
    pub faces_urls: Vec<String>,
    pub faces_storage_paths: Vec<String>,
}

impl NotificationPayload {
    pub fn new(
        image_id: impl Into<String>,
        image_url: impl Into<String>,
        image_storage_path: impl Into<String>,
        faces: &[FaceReference],
    ) -> Self {
        Self {
            image_id: image_id.into(),
            image_url: image_url.into(),
            image_storage_path: image_storage_path.into(),
            faces_ids: faces.iter().map(|f| f.id.clone()).collect(),
            faces_urls: faces.iter().map(|f| f.url.clone()).collect(),
            faces_storage_paths: faces.iter().map(|f| f.storage_path.clone()).collect(),
        }
    }
}

/// The single registered push destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingToken {
    #[serde(default)]
    pub client_id: String,
    pub token: String,
}
