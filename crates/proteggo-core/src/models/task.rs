use serde::{Deserialize, Serialize};

fn default_orientation() -> u32 {
    1
}

/// One queued unit of work: a raw upload awaiting processing.
///
/// Serialised as `{id, filePath, orientation}`, which is also the task request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: String,
    pub file_path: String,
    #[serde(default = "default_orientation")]
    pub orientation: u32,
}

impl UploadTask {
    pub fn new(id: impl Into<String>, file_path: impl Into<String>, orientation: u32) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            orientation,
        }
    }

    /// Decodes a task request body, rejecting payloads that can never succeed.
    pub fn from_json(body: &[u8]) -> Result<Self, anyhow::Error> {
        let task: UploadTask = serde_json::from_slice(body)
            .map_err(|e| anyhow::anyhow!("Malformed upload task payload: {}", e))?;
        task.validate()?;
        Ok(task)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.id.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload task id must not be empty"));
        }
        if self.id.contains('/') || self.id.contains("..") {
            return Err(anyhow::anyhow!("Upload task id contains path separators"));
        }
        if self.file_path.trim().is_empty() {
            return Err(anyhow::anyhow!("Upload task filePath must not be empty"));
        }
        Ok(())
    }
}
