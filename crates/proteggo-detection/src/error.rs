#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Face detection is not configured: {0}")]
    NotConfigured(String),

    #[error("Face detection request failed: {0}")]
    Request(String),

    #[error("Face detection API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid face detection response: {0}")]
    InvalidResponse(String),
}

impl DetectionError {
    /// Whether retrying the same image later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DetectionError::Request(_) => true,
            DetectionError::Api { status, .. } => *status == 429 || *status >= 500,
            DetectionError::NotConfigured(_) | DetectionError::InvalidResponse(_) => false,
        }
    }
}

impl From<reqwest::Error> for DetectionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DetectionError::InvalidResponse(err.to_string())
        } else {
            DetectionError::Request(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(DetectionError::Request("timeout".into()).is_transient());
        assert!(DetectionError::Api { status: 503, message: String::new() }.is_transient());
        assert!(DetectionError::Api { status: 429, message: String::new() }.is_transient());
        assert!(!DetectionError::Api { status: 400, message: String::new() }.is_transient());
        assert!(!DetectionError::NotConfigured("no key".into()).is_transient());
    }
}
