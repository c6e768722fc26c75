//! Upload service
//!
//! Validates every file of a request up front, then stores each one under a temp key and
//! enqueues one [`UploadTask`] for it. Per-file store or enqueue failures land in
//! `failedIds`; they never abort the rest of the batch.

use bytes::Bytes;
use proteggo_core::models::UploadTask;
use proteggo_processing::{read_exif_orientation, ImageKind, ValidationError};
use proteggo_storage::StorageKeys;
use serde::Serialize;

use crate::state::AppState;

/// One file part of an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-chosen image id (the multipart field name).
    pub image_id: String,
    pub data: Bytes,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub uploaded_ids: Vec<String>,
    pub failed_ids: Vec<String>,
}

pub struct UploadService<'a> {
    state: &'a AppState,
}

impl<'a> UploadService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Validate every file before anything is written.
    pub fn validate(&self, files: &[UploadedFile]) -> Result<Vec<ImageKind>, ValidationError> {
        files
            .iter()
            .map(|file| self.state.validator.validate_all(&file.image_id, &file.data))
            .collect()
    }

    #[tracing::instrument(skip(self, files), fields(file_count = files.len()))]
    pub async fn accept(
        &self,
        files: Vec<UploadedFile>,
    ) -> Result<UploadOutcome, ValidationError> {
        let kinds = self.validate(&files)?;
        let mut outcome = UploadOutcome::default();

        for (file, kind) in files.into_iter().zip(kinds) {
            if self.store_and_enqueue(&file, kind).await {
                outcome.uploaded_ids.push(file.image_id);
            } else {
                outcome.failed_ids.push(file.image_id);
            }
        }

        tracing::info!(
            uploaded = outcome.uploaded_ids.len(),
            failed = outcome.failed_ids.len(),
            "Upload batch accepted"
        );
        Ok(outcome)
    }

    async fn store_and_enqueue(&self, file: &UploadedFile, kind: ImageKind) -> bool {
        let orientation = read_exif_orientation(&file.data);
        let key = StorageKeys::temp_upload(kind.extension());

        if let Err(err) = self
            .state
            .storage
            .put(&key, file.data.to_vec(), kind.content_type())
            .await
        {
            tracing::error!(
                error = %err,
                image_id = %file.image_id,
                storage_key = %key,
                "Failed to store upload"
            );
            return false;
        }

        let task = UploadTask::new(file.image_id.clone(), key.clone(), orientation);
        match self.state.dispatcher.enqueue(&task).await {
            Ok(handle) => {
                tracing::debug!(
                    image_id = %file.image_id,
                    storage_key = %key,
                    orientation,
                    task = %handle,
                    backend = self.state.dispatcher.backend_name(),
                    "Upload task enqueued"
                );
                true
            }
            Err(err) => {
                // The temp blob stays behind; the temp purge removes it.
                tracing::error!(
                    error = %err,
                    image_id = %file.image_id,
                    storage_key = %key,
                    "Failed to enqueue upload task"
                );
                false
            }
        }
    }
}
