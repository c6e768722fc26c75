use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post submitted by a client. Face references are keyed by image id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub hash_tags_values: Vec<String>,
    #[serde(default)]
    pub hash_tags_ids: Vec<String>,
    #[serde(default)]
    pub images_ids: Vec<String>,
    #[serde(default)]
    pub images_urls: Vec<String>,
    #[serde(default)]
    pub images_storage_paths: Vec<String>,
    #[serde(default)]
    pub faces_ids: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub faces_urls: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub faces_storage_paths: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub overlays_ids: Vec<String>,
    #[serde(default)]
    pub overlays_urls: Vec<String>,
    #[serde(default)]
    pub overlays_storage_paths: Vec<String>,
    #[serde(default)]
    pub obscured_overlays_ids: Vec<String>,
    #[serde(default)]
    pub obscured_overlays_urls: Vec<String>,
    #[serde(default)]
    pub obscured_overlays_storage_paths: Vec<String>,
}
