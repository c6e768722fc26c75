use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use proteggo_core::models::{FaceBox, OverlayStyle, Vertex};

use crate::error::CodecError;

/// Outline colour of border overlays.
pub const BORDER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
/// Stroke width of border overlays, in pixels.
pub const BORDER_THICKNESS: i32 = 8;
/// Fill colour of obscured overlays.
pub const OBSCURE_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Largest side accepted for an overlay canvas; matches the WebP limit of delivered images.
pub const MAX_CANVAS_SIDE: u32 = 16_383;
/// Largest overlay canvas, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Crop the axis-aligned region between two corners, clamped to the image bounds.
pub fn crop_region(
    img: &DynamicImage,
    top_left: Vertex,
    bottom_right: Vertex,
) -> Result<DynamicImage, CodecError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(CodecError::EmptyImage { width, height });
    }

    let x0 = top_left.x.clamp(0, width as i32) as u32;
    let y0 = top_left.y.clamp(0, height as i32) as u32;
    let x1 = bottom_right.x.clamp(0, width as i32) as u32;
    let y1 = bottom_right.y.clamp(0, height as i32) as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(CodecError::InvalidRegion(format!(
            "({}, {})-({}, {}) is empty within {}x{}",
            top_left.x, top_left.y, bottom_right.x, bottom_right.y, width, height
        )));
    }

    Ok(img.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// Render a transparent overlay of the given size with one shape per face box.
///
/// Border style strokes four rectangles per box; obscure style fills the box.
/// Boxes are drawn independently in order, so overlapping shapes simply overdraw.
pub fn composite_overlay(
    width: u32,
    height: u32,
    boxes: &[FaceBox],
    style: OverlayStyle,
) -> Result<RgbaImage, CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::EmptyImage { width, height });
    }
    if width > MAX_CANVAS_SIDE
        || height > MAX_CANVAS_SIDE
        || u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS
    {
        return Err(CodecError::CanvasTooLarge {
            width,
            height,
            max: MAX_CANVAS_PIXELS,
        });
    }

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));

    for face in boxes {
        let (x0, y0) = (face.top_left.x, face.top_left.y);
        let (x2, y2) = (face.bottom_right.x, face.bottom_right.y);

        match style {
            OverlayStyle::Border => {
                let t = BORDER_THICKNESS;
                fill(&mut canvas, x0, y0, x2, y0 + t, BORDER_COLOR);
                fill(&mut canvas, x0, y2 - t, x2, y2, BORDER_COLOR);
                fill(&mut canvas, x0, y0, x0 + t, y2, BORDER_COLOR);
                fill(&mut canvas, x2 - t, y0, x2, y2, BORDER_COLOR);
            }
            OverlayStyle::Obscure => fill(&mut canvas, x0, y0, x2, y2, OBSCURE_COLOR),
        }
    }

    tracing::debug!(
        width = width,
        height = height,
        face_count = boxes.len(),
        style = ?style,
        "Composited overlay"
    );

    Ok(canvas)
}

fn fill(canvas: &mut RgbaImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
    let (w, h) = (x1 - x0, y1 - y0);
    if w <= 0 || h <= 0 {
        return;
    }
    draw_filled_rect_mut(canvas, Rect::at(x0, y0).of_size(w as u32, h as u32), color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x0: i32, y0: i32, x2: i32, y2: i32) -> FaceBox {
        FaceBox {
            top_left: Vertex::new(x0, y0),
            bottom_right: Vertex::new(x2, y2),
        }
    }

    #[test]
    fn test_border_outlines_box_and_leaves_centre_transparent() {
        let overlay =
            composite_overlay(100, 80, &[face(10, 10, 60, 60)], OverlayStyle::Border).unwrap();

        assert_eq!(overlay.dimensions(), (100, 80));
        assert_eq!(*overlay.get_pixel(10, 10), BORDER_COLOR);
        assert_eq!(*overlay.get_pixel(59, 59), BORDER_COLOR);
        assert_eq!(*overlay.get_pixel(17, 35), BORDER_COLOR);
        assert_eq!(overlay.get_pixel(35, 35)[3], 0);
        assert_eq!(overlay.get_pixel(5, 5)[3], 0);
    }

    #[test]
    fn test_obscure_fills_every_box() {
        let boxes = [face(0, 0, 20, 20), face(50, 50, 70, 70)];
        let overlay = composite_overlay(80, 80, &boxes, OverlayStyle::Obscure).unwrap();

        assert_eq!(*overlay.get_pixel(10, 10), OBSCURE_COLOR);
        assert_eq!(*overlay.get_pixel(60, 60), OBSCURE_COLOR);
        assert_eq!(overlay.get_pixel(35, 35)[3], 0);
    }

    #[test]
    fn test_boxes_outside_canvas_are_clipped() {
        let overlay =
            composite_overlay(30, 30, &[face(20, 20, 90, 90)], OverlayStyle::Obscure).unwrap();
        assert_eq!(*overlay.get_pixel(29, 29), OBSCURE_COLOR);
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let result = composite_overlay(0, 10, &[], OverlayStyle::Border);
        assert!(matches!(result, Err(CodecError::EmptyImage { .. })));
    }

    #[test]
    fn test_oversized_canvas_is_rejected_without_allocating() {
        let result = composite_overlay(u32::MAX, u32::MAX, &[], OverlayStyle::Obscure);
        assert!(matches!(result, Err(CodecError::CanvasTooLarge { .. })));

        let result = composite_overlay(16_000, 16_000, &[], OverlayStyle::Border);
        assert!(matches!(result, Err(CodecError::CanvasTooLarge { .. })));

        let result = composite_overlay(MAX_CANVAS_SIDE + 1, 1, &[], OverlayStyle::Border);
        assert!(matches!(result, Err(CodecError::CanvasTooLarge { .. })));
    }

    #[test]
    fn test_crop_region_clamps_to_bounds() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 30, Rgba([1, 2, 3, 255])));

        let crop = crop_region(&img, Vertex::new(10, 5), Vertex::new(30, 25)).unwrap();
        assert_eq!(crop.dimensions(), (20, 20));

        let crop = crop_region(&img, Vertex::new(-5, -5), Vertex::new(100, 100)).unwrap();
        assert_eq!(crop.dimensions(), (40, 30));

        let result = crop_region(&img, Vertex::new(20, 20), Vertex::new(20, 25));
        assert!(matches!(result, Err(CodecError::InvalidRegion(_))));
    }
}
