//! Image processing pipeline
//!
//! Turns one [`UploadTask`] into a processed image:
//! fetch -> correct orientation -> detect faces -> crop and persist faces -> border
//! overlay -> re-encode -> persist image record -> delete temp upload -> notify.
//!
//! Any failure before the record is persisted aborts the run with a [`TaskError`] whose
//! kind tells the queue whether to retry. Writes from completed steps are not rolled
//! back; a re-run overwrites them because face crops, face ids and the border overlay
//! are keyed by image id.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use chrono::Utc;
use image::{DynamicImage, GenericImageView};
use proteggo_core::models::{
    face_id, FaceBox, FaceRecord, FaceReference, ImageRecord, NotificationPayload, OverlayStyle,
    UploadTask,
};
use proteggo_core::{Config, TaskError, TaskResultExt};
use proteggo_db::DocumentError;
use proteggo_detection::{DetectedFace, DetectionError};
use proteggo_processing::{
    composite_overlay, crop_region, decode_image, CodecError, ImageCompressor, ImageOrientation,
    OutputFormat,
};
use proteggo_storage::{StorageError, StorageKeys};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// JPEG quality for face crops and the detection probe.
const JPEG_QUALITY: f32 = 75.0;
const WORKER_FAILED: &str = "Image worker thread failed";

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Record persisted, temp upload deleted, client notified.
    CompletedNotified,
    /// Record persisted but the temp upload could not be deleted; the client was not notified.
    CompletedCleanupFailed,
    /// Record persisted and temp upload deleted, but the notification failed.
    CompletedNotifyFailed,
}

impl PipelineOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOutcome::CompletedNotified => "completed_notified",
            PipelineOutcome::CompletedCleanupFailed => "completed_cleanup_failed",
            PipelineOutcome::CompletedNotifyFailed => "completed_notify_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageProcessingResult {
    pub outcome: PipelineOutcome,
    pub image: ImageRecord,
}

impl ImageProcessingResult {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "status": self.outcome.as_str(),
            "imageId": self.image.id,
            "url": self.image.url,
        })
    }
}

/// Task handler for uploaded images
#[derive(Debug, Clone)]
pub struct ImageProcessingTaskHandler {
    max_faces: u32,
    final_image_quality: f32,
}

impl ImageProcessingTaskHandler {
    pub fn new(max_faces: u32, final_image_quality: f32) -> Self {
        Self {
            max_faces,
            final_image_quality,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.face_detection_max_results(),
            config.final_image_quality(),
        )
    }

    #[tracing::instrument(
        skip(self, state, task),
        fields(image_id = %task.id, file_path = %task.file_path, orientation = task.orientation)
    )]
    pub async fn process(
        &self,
        state: &AppState,
        task: &UploadTask,
    ) -> Result<ImageProcessingResult, TaskError> {
        let started = Instant::now();
        task.validate().unrecoverable()?;

        let raw = state
            .storage
            .get(&task.file_path)
            .await
            .map_err(storage_failure("Failed to fetch temp upload"))?;

        let orientation = task.orientation;
        let (image, probe) = tokio::task::spawn_blocking(move || {
            let img = ImageOrientation::correct(decode_image(&raw)?, orientation);
            let probe = ImageCompressor::encode(&img, OutputFormat::Jpeg, JPEG_QUALITY)?;
            Ok::<_, CodecError>((Arc::new(img), probe))
        })
        .await
        .context(WORKER_FAILED)
        .recoverable()?
        .unrecoverable()?;
        let (width, height) = image.dimensions();

        let detected = state
            .detector
            .detect(&probe, self.max_faces)
            .await
            .map_err(detection_failure)?;
        tracing::debug!(face_count = detected.len(), width, height, "Faces detected");

        let boxes = face_boxes(&detected)?;
        let faces = self
            .persist_faces(state, task, image.clone(), &detected, &boxes)
            .await?;

        let (overlay_url, overlay_path) = if boxes.is_empty() {
            (String::new(), String::new())
        } else {
            let png = tokio::task::spawn_blocking(move || {
                let canvas = composite_overlay(width, height, &boxes, OverlayStyle::Border)?;
                ImageCompressor::encode(&DynamicImage::ImageRgba8(canvas), OutputFormat::Png, 100.0)
            })
            .await
            .context(WORKER_FAILED)
        .recoverable()?
            .unrecoverable()?;

            let key = StorageKeys::faces_overlay(&task.id);
            let url = state
                .publisher
                .publish(&key, png, OutputFormat::Png.to_mime_type())
                .await
                .map_err(storage_failure("Failed to upload faces overlay"))?;
            (url, key)
        };

        let quality = self.final_image_quality;
        let webp = tokio::task::spawn_blocking(move || {
            ImageCompressor::encode(&image, OutputFormat::WebP, quality)
        })
        .await
        .context(WORKER_FAILED)
        .recoverable()?
        .unrecoverable()?;

        let final_key = StorageKeys::final_image();
        let url = state
            .publisher
            .publish(&final_key, webp, OutputFormat::WebP.to_mime_type())
            .await
            .map_err(storage_failure("Failed to upload final image"))?;

        let mut record = ImageRecord {
            id: task.id.clone(),
            storage_path: final_key,
            url,
            width,
            height,
            created_at: Utc::now(),
            post_id: None,
            faces_ids: Vec::new(),
            faces_urls: Vec::new(),
            faces_storage_paths: Vec::new(),
            faces_overlay_url: overlay_url,
            faces_overlay_storage_path: overlay_path,
            faces_obscured_overlay_url: None,
            faces_obscured_overlay_storage_path: None,
        };
        record.set_faces(&faces);

        state
            .repos
            .images
            .save(&record)
            .await
            .map_err(document_failure("Failed to persist image record"))?;

        let outcome = match state.storage.delete(&task.file_path).await {
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    storage_key = %task.file_path,
                    "Failed to delete temp upload; client will not be notified"
                );
                PipelineOutcome::CompletedCleanupFailed
            }
            Ok(()) => {
                let payload =
                    NotificationPayload::new(&record.id, &record.url, &record.storage_path, &faces);
                match state.notifier.notify(&payload).await {
                    Ok(()) => PipelineOutcome::CompletedNotified,
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to notify client");
                        PipelineOutcome::CompletedNotifyFailed
                    }
                }
            }
        };

        tracing::info!(
            face_count = faces.len(),
            outcome = outcome.as_str(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Image processed"
        );

        Ok(ImageProcessingResult {
            outcome,
            image: record,
        })
    }

    /// Crop, upload and persist every detected face, one after another.
    async fn persist_faces(
        &self,
        state: &AppState,
        task: &UploadTask,
        image: Arc<DynamicImage>,
        detected: &[DetectedFace],
        boxes: &[FaceBox],
    ) -> Result<Vec<FaceReference>, TaskError> {
        if detected.is_empty() {
            return Ok(Vec::new());
        }

        let regions = boxes.to_vec();
        let crops = tokio::task::spawn_blocking(move || {
            regions
                .iter()
                .map(|b| {
                    let crop = crop_region(&image, b.top_left, b.bottom_right)?;
                    ImageCompressor::encode(&crop, OutputFormat::Jpeg, JPEG_QUALITY)
                })
                .collect::<Result<Vec<_>, CodecError>>()
        })
        .await
        .context(WORKER_FAILED)
        .recoverable()?
        .unrecoverable()?;

        let created_at = Utc::now();
        let mut faces = Vec::with_capacity(detected.len());

        for (index, (face, crop)) in detected.iter().zip(crops).enumerate() {
            let key = StorageKeys::face_crop(&task.id, index);
            let url = state
                .publisher
                .publish(&key, crop, OutputFormat::Jpeg.to_mime_type())
                .await
                .map_err(storage_failure("Failed to upload face crop"))?;

            let record = FaceRecord {
                id: face_id(&task.id, index),
                image_id: task.id.clone(),
                post_id: None,
                vertices: face.vertices.clone(),
                landmarks: face.landmarks.clone(),
                roll_angle: face.roll_angle,
                pan_angle: face.pan_angle,
                tilt_angle: face.tilt_angle,
                emotion: face.emotions.label(),
                url: url.clone(),
                storage_path: key.clone(),
                created_at,
            };
            state
                .repos
                .faces
                .save(&record)
                .await
                .map_err(document_failure("Failed to persist face"))?;

            faces.push(FaceReference {
                id: record.id,
                url,
                storage_path: key,
            });
        }

        Ok(faces)
    }
}

fn face_boxes(detected: &[DetectedFace]) -> Result<Vec<FaceBox>, TaskError> {
    detected
        .iter()
        .map(|face| {
            face.face_box().ok_or_else(|| {
                TaskError::unrecoverable(anyhow!(
                    "Detected face has {} vertices, expected 4",
                    face.vertices.len()
                ))
            })
        })
        .collect()
}

fn classify(transient: bool, err: anyhow::Error) -> TaskError {
    if transient {
        TaskError::recoverable(err)
    } else {
        TaskError::unrecoverable(err)
    }
}

fn storage_failure(step: &'static str) -> impl FnOnce(StorageError) -> TaskError {
    move |err| classify(err.is_transient(), anyhow::Error::new(err).context(step))
}

fn document_failure(step: &'static str) -> impl FnOnce(DocumentError) -> TaskError {
    move |err| classify(err.is_transient(), anyhow::Error::new(err).context(step))
}

fn detection_failure(err: DetectionError) -> TaskError {
    classify(
        err.is_transient(),
        anyhow::Error::new(err).context("Face detection failed"),
    )
}
