//! Face overlay service
//!
//! Obscured overlays are two-phase: a preview is rendered into the temp folder on demand
//! and promoted to its permanent key only when the client confirms it. Batch operations
//! report a per-image partition of succeeded and failed ids.

use std::collections::{BTreeMap, HashSet};

use image::DynamicImage;
use proteggo_core::models::{FaceBox, FacesOverlay, ObscuredOverlay, OverlayStyle};
use proteggo_core::AppError;
use proteggo_processing::{composite_overlay, ImageCompressor, OutputFormat};
use proteggo_storage::StorageKeys;
use serde::{Deserialize, Serialize};

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempObscuredOverlayRequest {
    pub image_id: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub faces_ids_to_obscure: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmObscuredRequest {
    pub images_ids: Vec<String>,
    /// Temp preview paths, positionally aligned with `images_ids`.
    pub obscured_storage_paths: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmObscuredOutcome {
    pub failed_ids: Vec<String>,
    pub obscured_overlays: Vec<ObscuredOverlay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesIdsRequest {
    pub images_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFacesRequest {
    /// Face id to face crop storage path.
    pub faces_to_delete: BTreeMap<String, String>,
}

/// Per-id result of a batch delete.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted_ids: Vec<String>,
    pub failed_ids: Vec<String>,
}

impl DeleteOutcome {
    pub fn record(&mut self, id: String, deleted: bool) {
        if deleted {
            self.deleted_ids.push(id);
        } else {
            self.failed_ids.push(id);
        }
    }
}

pub struct OverlayService<'a> {
    state: &'a AppState,
}

impl<'a> OverlayService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Render a preview with the selected faces obscured.
    ///
    /// The canvas takes the size of the stored image; the size the client sent must match it.
    /// An empty selection removes any stale preview and returns an empty descriptor.
    #[tracing::instrument(skip(self, request), fields(image_id = %request.image_id, selected = request.faces_ids_to_obscure.len()))]
    pub async fn create_temp_obscured(
        &self,
        request: TempObscuredOverlayRequest,
    ) -> Result<ObscuredOverlay, HttpAppError> {
        self.state.validator.validate_image_id(&request.image_id)?;
        let image = self
            .state
            .repos
            .images
            .get(&request.image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", request.image_id)))?;
        if (request.image_width, request.image_height) != (image.width, image.height) {
            return Err(AppError::Validation(format!(
                "Overlay size {}x{} does not match image {}x{}",
                request.image_width, request.image_height, image.width, image.height
            ))
            .into());
        }
        let temp_key = StorageKeys::temp_obscured_overlay(&request.image_id);

        let boxes = self
            .selected_face_boxes(&request.image_id, &request.faces_ids_to_obscure)
            .await?;

        if boxes.is_empty() {
            if self.state.storage.exists(&temp_key).await? {
                self.state.storage.delete(&temp_key).await?;
                tracing::debug!(storage_key = %temp_key, "Deleted stale obscured preview");
            }
            return Ok(ObscuredOverlay::empty(request.image_id));
        }

        let (width, height) = (image.width, image.height);
        let png = tokio::task::spawn_blocking(move || {
            let canvas = composite_overlay(width, height, &boxes, OverlayStyle::Obscure)?;
            ImageCompressor::encode(&DynamicImage::ImageRgba8(canvas), OutputFormat::Png, 100.0)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Overlay worker failed: {}", e)))??;

        let url = self
            .state
            .publisher
            .publish(&temp_key, png, OutputFormat::Png.to_mime_type())
            .await?;

        Ok(ObscuredOverlay {
            id: request.image_id,
            url,
            storage_path: temp_key,
        })
    }

    async fn selected_face_boxes(
        &self,
        image_id: &str,
        face_ids: &[String],
    ) -> Result<Vec<FaceBox>, HttpAppError> {
        if face_ids.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: HashSet<&str> = face_ids.iter().map(String::as_str).collect();
        self.state
            .repos
            .faces
            .list_by_image(image_id)
            .await?
            .into_iter()
            .filter(|face| wanted.contains(face.id.as_str()))
            .map(|face| {
                face.face_box().ok_or_else(|| {
                    HttpAppError(AppError::Data(format!(
                        "Face {} has {} vertices",
                        face.id,
                        face.vertices.len()
                    )))
                })
            })
            .collect()
    }

    /// Promote confirmed previews to their permanent keys.
    #[tracing::instrument(skip(self, request), fields(count = request.images_ids.len()))]
    pub async fn confirm_obscured(
        &self,
        request: ConfirmObscuredRequest,
    ) -> Result<ConfirmObscuredOutcome, HttpAppError> {
        if request.images_ids.len() != request.obscured_storage_paths.len() {
            return Err(AppError::InvalidInput(format!(
                "{} image ids but {} obscured storage paths",
                request.images_ids.len(),
                request.obscured_storage_paths.len()
            ))
            .into());
        }

        let mut outcome = ConfirmObscuredOutcome::default();
        for (image_id, temp_key) in request
            .images_ids
            .into_iter()
            .zip(request.obscured_storage_paths)
        {
            match self.promote(&image_id, &temp_key).await {
                Ok(overlay) => outcome.obscured_overlays.push(overlay),
                Err(err) => {
                    tracing::error!(error = %err, image_id = %image_id, storage_key = %temp_key, "Failed to confirm obscured overlay");
                    outcome.failed_ids.push(image_id);
                }
            }
        }

        Ok(outcome)
    }

    async fn promote(&self, image_id: &str, temp_key: &str) -> Result<ObscuredOverlay, anyhow::Error> {
        if !StorageKeys::is_temp(temp_key) {
            anyhow::bail!("{} is not a temp preview", temp_key);
        }
        if self.state.repos.images.get(image_id).await?.is_none() {
            anyhow::bail!("Image {} does not exist", image_id);
        }
        if !self.state.storage.exists(temp_key).await? {
            anyhow::bail!("Obscured preview {} does not exist", temp_key);
        }

        let key = StorageKeys::obscured_overlay(image_id);
        self.state.storage.move_object(temp_key, &key).await?;
        let url = self.state.publisher.refresh_url(&key).await?;
        self.state
            .repos
            .images
            .set_obscured_overlay(image_id, &url, &key)
            .await?;

        Ok(ObscuredOverlay {
            id: image_id.to_string(),
            url,
            storage_path: key,
        })
    }

    /// Border overlay of an image; empty when the image has none.
    #[tracing::instrument(skip(self))]
    pub async fn faces_overlay(&self, image_id: &str) -> Result<FacesOverlay, HttpAppError> {
        let key = StorageKeys::faces_overlay(image_id);
        if !self.state.storage.exists(&key).await? {
            return Ok(FacesOverlay {
                overlay_id: image_id.to_string(),
                ..Default::default()
            });
        }

        let image = self
            .state
            .repos
            .images
            .get(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {} not found", image_id)))?;

        Ok(FacesOverlay {
            overlay_id: image_id.to_string(),
            overlay_url: image.faces_overlay_url,
            overlay_storage_path: key,
            width: image.width,
            height: image.height,
        })
    }

    #[tracing::instrument(skip(self, request), fields(count = request.faces_to_delete.len()))]
    pub async fn delete_faces(&self, request: DeleteFacesRequest) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for (face_id, storage_path) in request.faces_to_delete {
            let result = async {
                self.state.repos.faces.delete(&face_id).await?;
                self.state.storage.delete(&storage_path).await?;
                Ok::<_, anyhow::Error>(())
            }
            .await;
            if let Err(err) = &result {
                tracing::error!(error = %err, face_id = %face_id, "Failed to delete face");
            }
            outcome.record(face_id, result.is_ok());
        }
        outcome
    }

    #[tracing::instrument(skip(self, request), fields(count = request.images_ids.len()))]
    pub async fn delete_faces_overlays(&self, request: ImagesIdsRequest) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for image_id in request.images_ids {
            let key = StorageKeys::faces_overlay(&image_id);
            let result = self.state.storage.delete(&key).await;
            if let Err(err) = &result {
                tracing::error!(error = %err, image_id = %image_id, "Failed to delete faces overlay");
            }
            outcome.record(image_id, result.is_ok());
        }
        outcome
    }

    /// Obscured overlays exist only for confirmed images; a missing one is skipped.
    #[tracing::instrument(skip(self, request), fields(count = request.images_ids.len()))]
    pub async fn delete_obscured_overlays(&self, request: ImagesIdsRequest) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for image_id in request.images_ids {
            let key = StorageKeys::obscured_overlay(&image_id);
            match self.state.storage.exists(&key).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(image_id = %image_id, "Obscured overlay does not exist");
                    continue;
                }
                Err(err) => {
                    tracing::error!(error = %err, image_id = %image_id, "Failed to check obscured overlay");
                    outcome.record(image_id, false);
                    continue;
                }
            }

            let result = async {
                self.state.storage.delete(&key).await?;
                if self.state.repos.images.get(&image_id).await?.is_some() {
                    self.state.repos.images.clear_obscured_overlay(&image_id).await?;
                }
                Ok::<_, anyhow::Error>(())
            }
            .await;
            if let Err(err) = &result {
                tracing::error!(error = %err, image_id = %image_id, "Failed to delete obscured overlay");
            }
            outcome.record(image_id, result.is_ok());
        }
        outcome
    }
}
