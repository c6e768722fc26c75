//! API route constants

pub const IMAGES_PATH: &str = "/api/images";
pub const IMAGES_TEMP_PATH: &str = "/api/images/temp";
pub const IMAGES_UNUSED_PATH: &str = "/api/images/unused";

pub const FACES_PATH: &str = "/api/faces";
pub const FACES_OVERLAY_PATH: &str = "/api/faces/overlay";
pub const OBSCURED_OVERLAY_PATH: &str = "/api/faces/overlay/obscured";
pub const OBSCURED_OVERLAY_TEMP_PATH: &str = "/api/faces/overlay/obscured/temp";

pub const POSTS_PATH: &str = "/api/posts";
pub const MESSAGING_PATH: &str = "/api/messaging";

/// Delivery URL route served for the local object store.
pub const FILES_PATH: &str = "/v0/b/{bucket}/o/{*key}";

/// Default page size of the image listing.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Upper bound on one listing page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Upper bound on file parts accepted in one upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 20;
