//! Face detection client
//!
//! [`FaceDetector`] is the seam the processing pipeline depends on;
//! [`GoogleVisionDetector`] implements it against the Cloud Vision REST API.

mod detector;
mod error;
mod google_vision;

pub use detector::{DetectedFace, FaceDetector};
pub use error::DetectionError;
pub use google_vision::GoogleVisionDetector;
