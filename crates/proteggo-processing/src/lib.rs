//! Proteggo image processing
//!
//! Pure image functions used by the upload handler and the processing pipeline:
//! - Decoding, EXIF orientation reading and correction
//! - Face cropping and overlay compositing
//! - Re-encoding to JPEG, PNG and WebP
//! - Upload validation by size and magic bytes
//!
//! Nothing here performs I/O; callers run the CPU-bound parts on a blocking thread.

pub mod compression;
pub mod error;
pub mod image;
pub mod validator;

pub use compression::{decode_image, ImageCompressor, OutputFormat};
pub use error::CodecError;
pub use self::image::{
    composite_overlay, crop_region, read_exif_orientation, ImageOrientation, BORDER_COLOR,
    BORDER_THICKNESS, OBSCURE_COLOR,
};
pub use validator::{ImageKind, UploadValidator, ValidationError};
