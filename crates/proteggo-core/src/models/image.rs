use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted image document, written once per processed upload.
///
/// `faces_ids`, `faces_urls` and `faces_storage_paths` are positionally aligned.
/// The overlay fields hold `""` when no face was detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub storage_path: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
    pub post_id: Option<String>,
    #[serde(default)]
    pub faces_ids: Vec<String>,
    #[serde(default)]
    pub faces_urls: Vec<String>,
    #[serde(default)]
    pub faces_storage_paths: Vec<String>,
    pub faces_overlay_url: String,
    pub faces_overlay_storage_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_obscured_overlay_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces_obscured_overlay_storage_path: Option<String>,
}

/// Location of one persisted face crop, as carried in image records and notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceReference {
    pub id: String,
    pub url: String,
    pub storage_path: String,
}

impl ImageRecord {
    pub fn has_faces(&self) -> bool {
        !self.faces_ids.is_empty()
    }

    pub fn has_overlay(&self) -> bool {
        !self.faces_overlay_storage_path.is_empty()
    }

    /// Splits face references into the three parallel sequences stored on the record.
    pub fn set_faces(&mut self, faces: &[FaceReference]) {
        self.faces_ids = faces.iter().map(|f| f.id.clone()).collect();
        self.faces_urls = faces.iter().map(|f| f.url.clone()).collect();
        self.faces_storage_paths = faces.iter().map(|f| f.storage_path.clone()).collect();
    }

    /// Re-zips the parallel sequences. Fails when their lengths disagree.
    pub fn faces(&self) -> Result<Vec<FaceReference>, anyhow::Error> {
        if self.faces_ids.len() != self.faces_urls.len()
            || self.faces_ids.len() != self.faces_storage_paths.len()
        {
            return Err(anyhow::anyhow!(
                "Image {} has misaligned face references ({} ids, {} urls, {} paths)",
                self.id,
                self.faces_ids.len(),
                self.faces_urls.len(),
                self.faces_storage_paths.len()
            ));
        }

        Ok(self
            .faces_ids
            .iter()
            .zip(&self.faces_urls)
            .zip(&self.faces_storage_paths)
            .map(|((id, url), storage_path)| FaceReference {
                id: id.clone(),
                url: url.clone(),
                storage_path: storage_path.clone(),
            })
            .collect())
    }
}
