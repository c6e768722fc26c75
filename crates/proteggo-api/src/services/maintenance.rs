//! Image maintenance: listing, batch deletes and storage cleanup.

use std::collections::BTreeMap;

use proteggo_core::constants::TEMP_FOLDER;
use proteggo_core::models::ImageRecord;
use serde::{Deserialize, Serialize};

use super::overlays::DeleteOutcome;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesQuery {
    pub page_size: Option<usize>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePathsPage {
    pub paths: Vec<String>,
    pub next_page_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImagesRequest {
    /// Image id to final image storage path.
    pub images_to_delete: BTreeMap<String, String>,
}

pub struct MaintenanceService<'a> {
    state: &'a AppState,
}

impl<'a> MaintenanceService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_images(&self, query: ListImagesQuery) -> Result<ImagePathsPage, HttpAppError> {
        let page_size = query
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let page = self
            .state
            .repos
            .images
            .list_page(page_size, query.page_token.as_deref())
            .await?;

        Ok(ImagePathsPage {
            paths: page.images.into_iter().map(|image| image.url).collect(),
            next_page_token: page.next_page_token,
        })
    }

    #[tracing::instrument(skip(self, request), fields(count = request.images_to_delete.len()))]
    pub async fn delete_images(&self, request: DeleteImagesRequest) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for (image_id, storage_path) in request.images_to_delete {
            let result = async {
                self.state.repos.images.delete(&image_id).await?;
                self.state.storage.delete(&storage_path).await?;
                Ok::<_, anyhow::Error>(())
            }
            .await;
            if let Err(err) = &result {
                tracing::error!(error = %err, image_id = %image_id, "Failed to delete image");
            }
            outcome.record(image_id, result.is_ok());
        }
        outcome
    }

    /// Delete every object under the temp prefix.
    ///
    /// Returns the number of objects removed. The first failure aborts the purge.
    #[tracing::instrument(skip(self))]
    pub async fn purge_temp(&self) -> Result<usize, HttpAppError> {
        let keys = self.state.storage.list(TEMP_FOLDER).await?;
        for key in &keys {
            self.state.storage.delete(key).await?;
        }
        tracing::info!(deleted = keys.len(), "Temp folder purged");
        Ok(keys.len())
    }

    /// Remove images no post references, with their faces and border overlay.
    #[tracing::instrument(skip(self))]
    pub async fn delete_unused(&self) -> Result<DeleteOutcome, HttpAppError> {
        let unused = self.state.repos.images.list_unused().await?;
        let mut outcome = DeleteOutcome::default();

        for image in unused {
            let result = self.delete_image_tree(&image).await;
            if let Err(err) = &result {
                tracing::error!(error = %err, image_id = %image.id, "Failed to delete unused image");
            }
            outcome.record(image.id, result.is_ok());
        }

        tracing::info!(
            deleted = outcome.deleted_ids.len(),
            failed = outcome.failed_ids.len(),
            "Unused images removed"
        );
        Ok(outcome)
    }

    async fn delete_image_tree(&self, image: &ImageRecord) -> Result<(), anyhow::Error> {
        let storage = &self.state.storage;

        storage.delete(&image.storage_path).await?;
        for face in self.state.repos.faces.list_by_image(&image.id).await? {
            storage.delete(&face.storage_path).await?;
            self.state.repos.faces.delete(&face.id).await?;
        }
        if !image.faces_overlay_storage_path.is_empty() {
            storage.delete(&image.faces_overlay_storage_path).await?;
        }

        // The record goes last so a failed run can be retried.
        self.state.repos.images.delete(&image.id).await?;
        Ok(())
    }
}
