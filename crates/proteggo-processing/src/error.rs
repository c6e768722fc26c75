/// Errors raised by the image codec and compositor.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Canvas {width}x{height} exceeds the {max} pixel limit")]
    CanvasTooLarge { width: u32, height: u32, max: u64 },

    #[error("Invalid crop region: {0}")]
    InvalidRegion(String),

    #[error("Failed to encode image as {format}: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },
}

impl CodecError {
    pub(crate) fn encode(format: &'static str, err: impl std::fmt::Display) -> Self {
        CodecError::Encode {
            format,
            message: err.to_string(),
        }
    }
}
