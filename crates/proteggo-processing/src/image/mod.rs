//! Image geometry: orientation correction, face crops and overlays.

pub mod compositor;
pub mod exif;
pub mod orientation;

pub use self::compositor::{composite_overlay, crop_region, BORDER_COLOR, BORDER_THICKNESS, OBSCURE_COLOR};
pub use self::exif::read_exif_orientation;
pub use self::orientation::ImageOrientation;
