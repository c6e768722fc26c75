//! Test fixtures: encoded images and detected faces.

use std::io::Cursor;

use axum_test::multipart::{MultipartForm, Part};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use proteggo_core::models::{EmotionLikelihoods, Likelihood, Vertex};
use proteggo_detection::DetectedFace;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("Failed to encode fixture");
    bytes
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Jpeg)
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(&gradient(width, height), ImageFormat::Png)
}

/// JPEG magic bytes padded past `size` bytes. Never decoded.
pub fn create_oversized_jpeg(size: usize) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(size, 0);
    bytes
}

/// A GIF header: well-formed image bytes of an unsupported type.
pub fn create_gif_header() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x00\x00\x00".to_vec()
}

/// A joyful face with its box at `(x, y)` and side `size`.
pub fn face_at(x: i32, y: i32, size: i32) -> DetectedFace {
    DetectedFace {
        vertices: vec![
            Vertex::new(x, y),
            Vertex::new(x + size, y),
            Vertex::new(x + size, y + size),
            Vertex::new(x, y + size),
        ],
        landmarks: vec![],
        roll_angle: 1.5,
        pan_angle: -3.0,
        tilt_angle: 0.5,
        emotions: EmotionLikelihoods {
            joy: Likelihood::VeryLikely,
            ..Default::default()
        },
    }
}

/// Multipart form with one file part per `(image_id, bytes, file_name)`.
pub fn upload_form(files: Vec<(&str, Vec<u8>, &str)>) -> MultipartForm {
    files
        .into_iter()
        .fold(MultipartForm::new(), |form, (image_id, data, file_name)| {
            let part = Part::bytes(bytes::Bytes::from(data))
                .file_name(file_name.to_string())
                .mime_type("application/octet-stream");
            form.add_part(image_id.to_string(), part)
        })
}
