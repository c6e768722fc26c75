use image::{imageops, DynamicImage};

/// EXIF orientation correction (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Rotate and flip `img` so it displays upright for the given EXIF orientation code.
    ///
    /// Codes outside 1-8 leave the image untouched.
    pub fn correct(img: DynamicImage, orientation: u32) -> DynamicImage {
        let (rotate, flip_h, flip_v) = Self::transforms(orientation);
        if rotate.is_none() && !flip_h && !flip_v {
            return img;
        }

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        let mut img = img;

        // Rotation first, then flips
        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }
        if flip_h {
            img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
        }
        if flip_v {
            img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
        }

        img
    }

    /// Transforms for an EXIF orientation code as (clockwise rotation, flip horizontal, flip vertical).
    pub fn transforms(orientation: u32) -> (Option<u16>, bool, bool) {
        match orientation {
            2 => (None, true, false),
            3 => (Some(180), false, false),
            4 => (None, false, true),
            // transpose
            5 => (Some(90), true, false),
            6 => (Some(90), false, false),
            // transverse
            7 => (Some(270), true, false),
            8 => (Some(270), false, false),
            _ => (None, false, false),
        }
    }

    /// Rotate clockwise by 90, 180 or 270 degrees. Any other angle is a no-op.
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
            180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
            270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
            _ => img,
        }
    }
}
