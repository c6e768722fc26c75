//! Google Cloud Vision `images:annotate` client, face detection only.

use async_trait::async_trait;
use base64::Engine;
use proteggo_core::models::{
    EmotionLikelihoods, Landmark, LandmarkPosition, Likelihood, Vertex as FaceVertex,
};
use proteggo_core::Config;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::detector::{DetectedFace, FaceDetector};
use crate::error::DetectionError;

pub struct GoogleVisionDetector {
    http_client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl Debug for GoogleVisionDetector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GoogleVisionDetector")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GoogleVisionDetector {
    pub fn new(api_key: Option<String>, endpoint: impl Into<String>) -> Result<Self, DetectionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                DetectionError::Request(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_key,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DetectionError> {
        if config.google_vision_api_key().is_none() {
            tracing::warn!("GOOGLE_VISION_API_KEY not set; face detection requests will fail");
        }
        Self::new(
            config.google_vision_api_key().map(str::to_string),
            config.google_vision_endpoint(),
        )
    }

    async fn annotate_image(
        &self,
        api_key: &str,
        image: &[u8],
        max_results: u32,
    ) -> Result<VisionResponse, DetectionError> {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image);

        let request_body = json!({
            "requests": [{
                "image": {
                    "content": image_base64
                },
                "features": [{
                    "type": "FACE_DETECTION",
                    "maxResults": max_results
                }]
            }]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DetectionError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl FaceDetector for GoogleVisionDetector {
    #[tracing::instrument(skip(self, image), fields(image_size = image.len()))]
    async fn detect(
        &self,
        image: &[u8],
        max_results: u32,
    ) -> Result<Vec<DetectedFace>, DetectionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DetectionError::NotConfigured("GOOGLE_VISION_API_KEY".to_string()))?;

        let response = self.annotate_image(api_key, image, max_results).await?;
        let faces = faces_from_response(response)?;

        tracing::debug!(face_count = faces.len(), "Face detection completed");
        Ok(faces)
    }

    fn name(&self) -> &'static str {
        "google-vision"
    }
}

fn faces_from_response(response: VisionResponse) -> Result<Vec<DetectedFace>, DetectionError> {
    let Some(first) = response.responses.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    if let Some(error) = first.error {
        return Err(DetectionError::Api {
            status: error.code.map(grpc_to_http_status).unwrap_or(500),
            message: error.message.unwrap_or_default(),
        });
    }

    first
        .face_annotations
        .unwrap_or_default()
        .into_iter()
        .map(DetectedFace::try_from)
        .collect()
}

/// Maps the google.rpc status code embedded in a per-image error onto HTTP semantics.
fn grpc_to_http_status(code: i32) -> u16 {
    match code {
        3 | 9 | 11 => 400,
        5 => 404,
        7 => 403,
        8 => 429,
        16 => 401,
        4 | 14 => 503,
        _ => 500,
    }
}

impl TryFrom<FaceAnnotation> for DetectedFace {
    type Error = DetectionError;

    fn try_from(face: FaceAnnotation) -> Result<Self, Self::Error> {
        let vertices: Vec<FaceVertex> = face
            .bounding_poly
            .and_then(|p| p.vertices)
            .unwrap_or_default()
            .into_iter()
            .map(|v| FaceVertex::new(v.x.unwrap_or(0), v.y.unwrap_or(0)))
            .collect();

        if vertices.len() != 4 {
            return Err(DetectionError::InvalidResponse(format!(
                "bounding polygon has {} vertices, expected 4",
                vertices.len()
            )));
        }

        let landmarks = face
            .landmarks
            .unwrap_or_default()
            .into_iter()
            .map(|l| {
                let position = l.position.unwrap_or_default();
                Landmark {
                    kind: l.kind.unwrap_or_default(),
                    position: LandmarkPosition {
                        x: position.x.unwrap_or(0.0),
                        y: position.y.unwrap_or(0.0),
                        z: position.z.unwrap_or(0.0),
                    },
                }
            })
            .collect();

        let likelihood = |value: Option<String>| {
            value.as_deref().map(Likelihood::parse).unwrap_or_default()
        };

        Ok(DetectedFace {
            vertices,
            landmarks,
            roll_angle: face.roll_angle.unwrap_or(0.0),
            pan_angle: face.pan_angle.unwrap_or(0.0),
            tilt_angle: face.tilt_angle.unwrap_or(0.0),
            emotions: EmotionLikelihoods {
                joy: likelihood(face.joy_likelihood),
                sorrow: likelihood(face.sorrow_likelihood),
                anger: likelihood(face.anger_likelihood),
                surprise: likelihood(face.surprise_likelihood),
            },
        })
    }
}

// Cloud Vision response types
#[derive(Debug, Deserialize)]
struct VisionResponse {
    responses: Option<Vec<AnnotateImageResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    face_annotations: Option<Vec<FaceAnnotation>>,
    error: Option<VisionError>,
}

#[derive(Debug, Deserialize)]
struct BoundingPoly {
    vertices: Option<Vec<Vertex>>,
}

#[derive(Debug, Deserialize)]
struct Vertex {
    x: Option<i32>,
    y: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaceAnnotation {
    bounding_poly: Option<BoundingPoly>,
    landmarks: Option<Vec<FaceLandmark>>,
    roll_angle: Option<f32>,
    pan_angle: Option<f32>,
    tilt_angle: Option<f32>,
    joy_likelihood: Option<String>,
    sorrow_likelihood: Option<String>,
    anger_likelihood: Option<String>,
    surprise_likelihood: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FaceLandmark {
    #[serde(rename = "type")]
    kind: Option<String>,
    position: Option<Position>,
}

#[derive(Debug, Default, Deserialize)]
struct Position {
    x: Option<f32>,
    y: Option<f32>,
    z: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct VisionError {
    code: Option<i32>,
    message: Option<String>,
}
