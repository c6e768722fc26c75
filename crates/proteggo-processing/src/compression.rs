use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::error::CodecError;

/// Output format for encoded artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Face crops
    Jpeg,
    /// Overlays (keeps the alpha channel)
    Png,
    /// Delivered images
    WebP,
}

impl OutputFormat {
    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => ".jpg",
            OutputFormat::Png => ".png",
            OutputFormat::WebP => ".webp",
        }
    }

    fn name(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }
}

/// Decode JPEG or PNG bytes, rejecting images without pixels.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, CodecError> {
    let img = image::load_from_memory(data).map_err(|e| CodecError::Decode(e.to_string()))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(CodecError::EmptyImage { width, height });
    }
    Ok(img)
}

/// Encoder for every artifact the pipeline writes
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode `img` in `format`. `quality` (0-100) applies to the lossy formats only.
    pub fn encode(
        img: &DynamicImage,
        format: OutputFormat,
        quality: f32,
    ) -> Result<Vec<u8>, CodecError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(CodecError::EmptyImage { width, height });
        }

        let data = match format {
            OutputFormat::Jpeg => Self::compress_jpeg(img, quality)?,
            OutputFormat::Png => Self::compress_png(img)?,
            OutputFormat::WebP => Self::compress_webp(img, quality),
        };

        tracing::debug!(
            format = format.name(),
            width = width,
            height = height,
            size_bytes = data.len(),
            "Encoded image"
        );

        Ok(data)
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: f32) -> Result<Vec<u8>, CodecError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1.0, 100.0));
        comp.set_optimize_coding(true);

        let mut comp = comp
            .start_compress(Vec::new())
            .map_err(|e| CodecError::encode("jpeg", e))?;
        comp.write_scanlines(&rgb_img)
            .map_err(|e| CodecError::encode("jpeg", e))?;
        comp.finish().map_err(|e| CodecError::encode("jpeg", e))
    }

    fn compress_png(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| CodecError::encode("png", e))?;
        Ok(buffer)
    }

    fn compress_webp(img: &DynamicImage, quality: f32) -> Vec<u8> {
        let (width, height) = img.dimensions();
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        encoder.encode(quality.clamp(0.0, 100.0)).to_vec()
    }
}
