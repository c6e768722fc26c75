//! Storage layout and document collection names.

/// Object store folder for raw uploads and unconfirmed obscured previews.
pub const TEMP_FOLDER: &str = "_temp/";
/// Object store folder for face crops.
pub const FACES_FOLDER: &str = "faces/";
/// Object store folder for border overlays, one per image.
pub const FACES_OVERLAY_FOLDER: &str = "faces_overlays/";
/// Object store folder for confirmed obscured overlays, one per image.
pub const OBSCURED_FACES_OVERLAY_FOLDER: &str = "obscured_faces_overlays/";
/// Object store folder for re-encoded final images.
pub const IMAGES_FOLDER: &str = "images/";

pub const IMAGES_COLLECTION: &str = "images";
pub const FACES_COLLECTION: &str = "faces";
pub const POSTS_COLLECTION: &str = "posts";
pub const MESSAGING_TOKEN_COLLECTION: &str = "messaging";
pub const MESSAGING_TOKEN_DOCUMENT: &str = "registrationToken";

/// Internal path the task queue posts upload tasks to.
pub const IMAGE_PROCESSING_TASK_PATH: &str = "/tasks/image-processing";

/// Header carrying the task request signature.
pub const TASK_SIGNATURE_HEADER: &str = "x-proteggo-signature";

/// Document field names used in queries and merge updates.
pub mod fields {
    pub const CREATED_AT: &str = "createdAt";
    pub const POST_ID: &str = "postId";
    pub const IMAGE_ID: &str = "imageId";
    pub const URL: &str = "url";
    pub const STORAGE_PATH: &str = "storagePath";
    pub const FACES_OBSCURED_OVERLAY_URL: &str = "facesObscuredOverlayUrl";
    pub const FACES_OBSCURED_OVERLAY_STORAGE_PATH: &str = "facesObscuredOverlayStoragePath";
}
