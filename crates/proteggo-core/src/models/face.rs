use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Integer pixel coordinate of a bounding-box corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Vertex {
    pub x: i32,
    pub y: i32,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face box described by its top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top_left: Vertex,
    pub bottom_right: Vertex,
}

impl FaceBox {
    /// Reads the box from a 4-point polygon ordered top-left, top-right, bottom-right,
    /// bottom-left. Only indices 0 and 2 are used.
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        if vertices.len() != 4 {
            return None;
        }
        Some(Self {
            top_left: vertices[0],
            bottom_right: vertices[2],
        })
    }

    pub fn to_vertices(&self) -> Vec<Vertex> {
        vec![
            self.top_left,
            Vertex::new(self.bottom_right.x, self.top_left.y),
            self.bottom_right,
            Vertex::new(self.top_left.x, self.bottom_right.y),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct LandmarkPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Named 3-D facial landmark (e.g. `LEFT_EYE`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(rename = "type")]
    pub kind: String,
    pub position: LandmarkPosition,
}

/// Likelihood scale reported by the detection service, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    /// Parses the service's string form; anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        match value {
            "VERY_UNLIKELY" => Likelihood::VeryUnlikely,
            "UNLIKELY" => Likelihood::Unlikely,
            "POSSIBLE" => Likelihood::Possible,
            "LIKELY" => Likelihood::Likely,
            "VERY_LIKELY" => Likelihood::VeryLikely,
            _ => Likelihood::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sorrow,
    Anger,
    Surprise,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sorrow => "sorrow",
            Emotion::Anger => "anger",
            Emotion::Surprise => "surprise",
        }
    }
}

/// Per-emotion likelihoods for one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmotionLikelihoods {
    pub joy: Likelihood,
    pub sorrow: Likelihood,
    pub anger: Likelihood,
    pub surprise: Likelihood,
}

impl EmotionLikelihoods {
    /// Highest-likelihood emotion. Ties resolve in the order joy, sorrow, anger,
    /// surprise. Returns `None` when every likelihood is `Unknown`.
    pub fn dominant(&self) -> Option<Emotion> {
        let ranked = [
            (Emotion::Joy, self.joy),
            (Emotion::Sorrow, self.sorrow),
            (Emotion::Anger, self.anger),
            (Emotion::Surprise, self.surprise),
        ];

        let mut best: Option<(Emotion, Likelihood)> = None;
        for (emotion, likelihood) in ranked {
            if likelihood <= Likelihood::Unknown {
                continue;
            }
            match best {
                Some((_, current)) if current >= likelihood => {}
                _ => best = Some((emotion, likelihood)),
            }
        }
        best.map(|(emotion, _)| emotion)
    }

    /// Label stored on the face document; empty when no emotion was detected.
    pub fn label(&self) -> String {
        self.dominant()
            .map(|e| e.as_str().to_string())
            .unwrap_or_default()
    }
}

/// Stable face id for the `index`-th detection of an image, so re-processing the same
/// upload overwrites the same documents and crops.
pub fn face_id(image_id: &str, index: usize) -> String {
    let name = format!("proteggo:face:{}:{}", image_id, index);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

/// Persisted face document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub id: String,
    pub image_id: String,
    pub post_id: Option<String>,
    pub vertices: Vec<Vertex>,
    pub landmarks: Vec<Landmark>,
    pub roll_angle: f32,
    pub pan_angle: f32,
    pub tilt_angle: f32,
    pub emotion: String,
    pub url: String,
    pub storage_path: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl FaceRecord {
    pub fn face_box(&self) -> Option<FaceBox> {
        FaceBox::from_vertices(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_emotion_picks_highest() {
        let likelihoods = EmotionLikelihoods {
            joy: Likelihood::Unlikely,
            sorrow: Likelihood::VeryUnlikely,
            anger: Likelihood::Likely,
            surprise: Likelihood::Possible,
        };
        assert_eq!(likelihoods.dominant(), Some(Emotion::Anger));
        assert_eq!(likelihoods.label(), "anger");
    }

    #[test]
    fn test_dominant_emotion_tie_break_is_fixed() {
        let likelihoods = EmotionLikelihoods {
            joy: Likelihood::Possible,
            sorrow: Likelihood::Possible,
            anger: Likelihood::Possible,
            surprise: Likelihood::Possible,
        };
        assert_eq!(likelihoods.dominant(), Some(Emotion::Joy));

        let likelihoods = EmotionLikelihoods {
            joy: Likelihood::Unlikely,
            sorrow: Likelihood::Likely,
            anger: Likelihood::Unlikely,
            surprise: Likelihood::Likely,
        };
        assert_eq!(likelihoods.dominant(), Some(Emotion::Sorrow));
    }

    #[test]
    fn test_unknown_likelihoods_give_empty_label() {
        assert_eq!(EmotionLikelihoods::default().dominant(), None);
        assert_eq!(EmotionLikelihoods::default().label(), "");
    }

    #[test]
    fn test_likelihood_parse() {
        assert_eq!(Likelihood::parse("VERY_LIKELY"), Likelihood::VeryLikely);
        assert_eq!(Likelihood::parse("UNKNOWN"), Likelihood::Unknown);
        assert_eq!(Likelihood::parse("garbage"), Likelihood::Unknown);
    }

    #[test]
    fn test_face_box_requires_four_vertices() {
        let vertices = FaceBox {
            top_left: Vertex::new(10, 20),
            bottom_right: Vertex::new(50, 80),
        }
        .to_vertices();
        let face_box = FaceBox::from_vertices(&vertices).unwrap();
        assert_eq!(face_box.top_left, Vertex::new(10, 20));
        assert_eq!(face_box.bottom_right, Vertex::new(50, 80));
        assert!(FaceBox::from_vertices(&vertices[..3]).is_none());
    }

    #[test]
    fn test_face_id_is_deterministic() {
        assert_eq!(face_id("img-1", 0), face_id("img-1", 0));
        assert_ne!(face_id("img-1", 0), face_id("img-1", 1));
        assert_ne!(face_id("img-1", 0), face_id("img-2", 0));
    }

    #[test]
    fn test_face_record_round_trips_landmark_type_field() {
        let json = serde_json::json!({
            "id": "f1",
            "imageId": "img-1",
            "postId": null,
            "vertices": [{"x": 0, "y": 0}, {"x": 4, "y": 0}, {"x": 4, "y": 4}, {"x": 0, "y": 4}],
            "landmarks": [{"type": "LEFT_EYE", "position": {"x": 1.0, "y": 2.0, "z": 0.5}}],
            "rollAngle": 1.5,
            "panAngle": -3.0,
            "tiltAngle": 0.0,
            "emotion": "joy",
            "url": "https://example/f1",
            "storagePath": "faces/img-1_0.jpg",
            "createdAt": "2024-03-01T09:00:00.000000Z"
        });
        let face: FaceRecord = serde_json::from_value(json).unwrap();
        assert_eq!(face.landmarks[0].kind, "LEFT_EYE");
        assert!(face.post_id.is_none());
        assert!(face.face_box().is_some());
    }
}
