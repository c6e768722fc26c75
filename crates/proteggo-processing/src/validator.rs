/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid image id: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Raster formats accepted for upload, identified by their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

impl ImageKind {
    /// Identify the format from the leading bytes, ignoring any declared content type.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(JPEG_MAGIC) {
            Some(ImageKind::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Some(ImageKind::Png)
        } else {
            None
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => ".jpg",
            ImageKind::Png => ".png",
        }
    }
}

/// Best-effort label for a rejected payload, used in error messages only.
fn describe_unknown(data: &[u8]) -> String {
    let head: Vec<String> = data.iter().take(4).map(|b| format!("{:02x}", b)).collect();
    format!("unrecognised bytes [{}]", head.join(" "))
}

/// Image upload validator
///
/// Enforces the per-file size cap and sniffs the format from magic bytes.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn validate_content(&self, data: &[u8]) -> Result<ImageKind, ValidationError> {
        ImageKind::sniff(data).ok_or_else(|| ValidationError::InvalidContentType {
            content_type: describe_unknown(data),
            allowed: vec![
                ImageKind::Jpeg.content_type().to_string(),
                ImageKind::Png.content_type().to_string(),
            ],
        })
    }

    /// Image ids become storage keys and document ids.
    pub fn validate_image_id(&self, id: &str) -> Result<(), ValidationError> {
        if id.trim().is_empty() || id.len() > 128 {
            return Err(ValidationError::InvalidFilename(id.to_string()));
        }
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(ValidationError::InvalidFilename(id.to_string()));
        }
        Ok(())
    }

    /// Validate one uploaded part and return its sniffed format.
    pub fn validate_all(&self, id: &str, data: &[u8]) -> Result<ImageKind, ValidationError> {
        self.validate_image_id(id)?;
        self.validate_file_size(data.len())?;
        self.validate_content(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_ignores_everything_but_magic_bytes() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"\x89PNG\r\n\x1a\n\0\0"), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
        assert_eq!(ImageKind::sniff(b""), None);
    }

    #[test]
    fn test_size_cap() {
        let validator = UploadValidator::new(5 * 1024 * 1024);
        assert!(validator.validate_file_size(1024).is_ok());
        assert!(validator.validate_file_size(5 * 1024 * 1024).is_ok());
        assert!(matches!(
            validator.validate_file_size(5 * 1024 * 1024 + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_validate_all() {
        let validator = UploadValidator::new(100);
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDB, 0x00];

        assert_eq!(validator.validate_all("img-1", &jpeg).unwrap(), ImageKind::Jpeg);
        assert!(matches!(
            validator.validate_all("img-1", b"%PDF-1.7"),
            Err(ValidationError::InvalidContentType { .. })
        ));
        assert!(matches!(
            validator.validate_all("../etc", &jpeg),
            Err(ValidationError::InvalidFilename(_))
        ));
        assert!(matches!(
            validator.validate_all("img-1", &[0xFF; 101]),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }
}
