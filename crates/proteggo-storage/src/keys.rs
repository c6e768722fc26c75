//! Key generation for every object the service writes.

use proteggo_core::constants::{
    FACES_FOLDER, FACES_OVERLAY_FOLDER, IMAGES_FOLDER, OBSCURED_FACES_OVERLAY_FOLDER, TEMP_FOLDER,
};

pub struct StorageKeys;

impl StorageKeys {
    fn random_name() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// `_temp/<random><ext>`; `extension` includes the leading dot.
    pub fn temp_upload(extension: &str) -> String {
        format!("{}{}{}", TEMP_FOLDER, Self::random_name(), extension)
    }

    /// `_temp/<imageId>.png`
    pub fn temp_obscured_overlay(image_id: &str) -> String {
        format!("{}{}.png", TEMP_FOLDER, image_id)
    }

    /// `faces/<imageId>_<index>.jpg`
    pub fn face_crop(image_id: &str, index: usize) -> String {
        format!("{}{}_{}.jpg", FACES_FOLDER, image_id, index)
    }

    /// `faces_overlays/<imageId>.png`
    pub fn faces_overlay(image_id: &str) -> String {
        format!("{}{}.png", FACES_OVERLAY_FOLDER, image_id)
    }

    /// `obscured_faces_overlays/<imageId>.png`
    pub fn obscured_overlay(image_id: &str) -> String {
        format!("{}{}.png", OBSCURED_FACES_OVERLAY_FOLDER, image_id)
    }

    /// `images/<random>.webp`
    pub fn final_image() -> String {
        format!("{}{}.webp", IMAGES_FOLDER, Self::random_name())
    }

    pub fn is_temp(key: &str) -> bool {
        key.starts_with(TEMP_FOLDER)
    }
}
