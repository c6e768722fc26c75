use async_trait::async_trait;
use proteggo_core::models::{EmotionLikelihoods, FaceBox, Landmark, Vertex};

use crate::error::DetectionError;

/// One face as reported by the detection service.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    /// Four corners, top-left first, clockwise.
    pub vertices: Vec<Vertex>,
    pub landmarks: Vec<Landmark>,
    pub roll_angle: f32,
    pub pan_angle: f32,
    pub tilt_angle: f32,
    pub emotions: EmotionLikelihoods,
}

impl DetectedFace {
    pub fn face_box(&self) -> Option<FaceBox> {
        FaceBox::from_vertices(&self.vertices)
    }
}

/// Face detection service
///
/// Implementations return every face found, up to `max_results`, or an error.
/// There is no partial result.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(
        &self,
        image: &[u8],
        max_results: u32,
    ) -> Result<Vec<DetectedFace>, DetectionError>;

    fn name(&self) -> &'static str;
}
