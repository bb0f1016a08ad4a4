//! Watermark placement and compositing.
//!
//! The mark is scaled to fit within a fraction of the target image and placed
//! at one of nine anchor positions. Placement leaves `margin` pixels on the far
//! side of the anchor axis only, so a top-left mark touches the corner.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Default fraction of the image width/height the mark may occupy.
pub const DEFAULT_MARK_SCALE: f32 = 0.25;

/// Default distance in pixels between the mark and the far image edge.
pub const DEFAULT_MARGIN_PX: u32 = 16;

/// Anchor for the mark, laid out like a 3x3 keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MarkerPosition {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    #[default]
    BottomRight,
}

impl MarkerPosition {
    /// All positions in row-major order.
    pub const ALL: [Self; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// (horizontal, vertical) bias in `[0, 1]`.
    pub fn bias(self) -> (f32, f32) {
        let (row, column) = self.grid_cell();
        (column as f32 * 0.5, row as f32 * 0.5)
    }

    /// (row, column) of this position in a 3x3 picker.
    pub fn grid_cell(self) -> (u32, u32) {
        let i = Self::ALL.iter().position(|p| *p == self).unwrap_or(8) as u32;
        (i / 3, i % 3)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TopLeft => "Top left",
            Self::TopCenter => "Top",
            Self::TopRight => "Top right",
            Self::CenterLeft => "Left",
            Self::Center => "Center",
            Self::CenterRight => "Right",
            Self::BottomLeft => "Bottom left",
            Self::BottomCenter => "Bottom",
            Self::BottomRight => "Bottom right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkSettings {
    /// Fraction of the image the mark may occupy on each axis, `(0, 1]`.
    pub scale: f32,
    pub margin_px: u32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_MARK_SCALE,
            margin_px: DEFAULT_MARGIN_PX,
        }
    }
}

/// Uniform factor that fits a `mark_w x mark_h` mark inside
/// `floor(image_w * scale) x floor(image_h * scale)`.
pub fn scale_factor(image_w: u32, image_h: u32, mark_w: u32, mark_h: u32, scale: f32) -> f32 {
    if mark_w == 0 || mark_h == 0 {
        return 0.0;
    }
    let max_w = (image_w as f32 * scale).floor();
    let max_h = (image_h as f32 * scale).floor();
    (max_w / mark_w as f32).min(max_h / mark_h as f32)
}

/// Size of the mark after scaling, never smaller than 1x1.
pub fn scaled_mark_size(image: (u32, u32), mark: (u32, u32), scale: f32) -> (u32, u32) {
    let factor = scale_factor(image.0, image.1, mark.0, mark.1, scale);
    let width = ((mark.0 as f32 * factor) as u32).max(1);
    let height = ((mark.1 as f32 * factor) as u32).max(1);
    (width, height)
}

/// Top-left corner of a mark of `mark` size placed at `position`.
pub fn placement(
    image: (u32, u32),
    mark: (u32, u32),
    margin_px: u32,
    position: MarkerPosition,
) -> (i64, i64) {
    let (h_bias, v_bias) = position.bias();
    let free_w = image.0 as i64 - mark.0 as i64 - margin_px as i64;
    let free_h = image.1 as i64 - mark.1 as i64 - margin_px as i64;
    let left = (free_w as f32 * h_bias) as i64;
    let top = (free_h as f32 * v_bias) as i64;
    (left.max(0), top.max(0))
}

/// Returns `base` with `mark` scaled and alpha-blended at `position`.
pub fn apply_watermark(
    base: &DynamicImage,
    mark: &DynamicImage,
    position: MarkerPosition,
    settings: &WatermarkSettings,
) -> DynamicImage {
    let image_size = base.dimensions();
    let mark_size = scaled_mark_size(image_size, mark.dimensions(), settings.scale);
    let resized = mark
        .resize_exact(mark_size.0, mark_size.1, FilterType::CatmullRom)
        .to_rgba8();
    let (left, top) = placement(image_size, mark_size, settings.margin_px, position);

    let mut canvas = base.to_rgba8();
    imageops::overlay(&mut canvas, &resized, left, top);
    DynamicImage::ImageRgba8(canvas)
}

/// Built-in mark used when no logo file is configured: a translucent framed badge.
pub fn default_mark() -> DynamicImage {
    let width = 160u32;
    let height = 64u32;
    let border = 6u32;
    let frame = Rgba([0xff, 0xff, 0xff, 0xd0]);
    let fill = Rgba([0xff, 0xff, 0xff, 0x50]);
    let stripe = Rgba([0x00, 0x00, 0x00, 0x60]);

    let mut pixels = RgbaImage::from_pixel(width, height, fill);
    for (x, y, pixel) in pixels.enumerate_pixels_mut() {
        let on_border =
            x < border || y < border || x >= width - border || y >= height - border;
        if on_border {
            *pixel = frame;
        } else if (x + y) % 24 < 3 {
            *pixel = stripe;
        }
    }
    DynamicImage::ImageRgba8(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    #[test]
    fn test_bias_table() {
        assert_eq!(MarkerPosition::TopLeft.bias(), (0.0, 0.0));
        assert_eq!(MarkerPosition::TopCenter.bias(), (0.5, 0.0));
        assert_eq!(MarkerPosition::CenterRight.bias(), (1.0, 0.5));
        assert_eq!(MarkerPosition::Center.bias(), (0.5, 0.5));
        assert_eq!(MarkerPosition::BottomLeft.bias(), (0.0, 1.0));
        assert_eq!(MarkerPosition::BottomRight.bias(), (1.0, 1.0));
    }

    #[test]
    fn test_grid_cells_are_distinct() {
        let mut cells: Vec<_> = MarkerPosition::ALL.iter().map(|p| p.grid_cell()).collect();
        cells.sort();
        cells.dedup();
        assert_eq!(cells.len(), 9);
        assert_eq!(MarkerPosition::CenterLeft.grid_cell(), (1, 0));
    }

    #[test]
    fn test_scale_factor_limited_by_tighter_axis() {
        // 1000x400 image: mark may be at most 250x100.
        let factor = scale_factor(1000, 400, 100, 100, 0.25);
        assert!((factor - 1.0).abs() < f32::EPSILON);
        assert_eq!(scaled_mark_size((1000, 400), (100, 100), 0.25), (100, 100));
        assert_eq!(scaled_mark_size((1000, 1000), (500, 100), 0.25), (250, 50));
    }

    #[test]
    fn test_scaled_mark_never_vanishes() {
        assert_eq!(scaled_mark_size((2, 2), (500, 500), 0.25), (1, 1));
        assert_eq!(scale_factor(100, 100, 0, 10, 0.25), 0.0);
    }

    #[test]
    fn test_placement_corners() {
        let image = (200, 100);
        let mark = (40, 20);
        assert_eq!(placement(image, mark, 16, MarkerPosition::TopLeft), (0, 0));
        assert_eq!(placement(image, mark, 16, MarkerPosition::BottomRight), (144, 64));
        assert_eq!(placement(image, mark, 16, MarkerPosition::Center), (72, 32));
    }

    #[test]
    fn test_placement_clamps_when_margin_exceeds_space() {
        assert_eq!(placement((10, 10), (8, 8), 16, MarkerPosition::BottomRight), (0, 0));
    }

    #[test]
    fn test_apply_watermark_touches_only_mark_area() {
        let base = solid(100, 100, [0, 0, 0, 255]);
        let mark = solid(10, 10, [255, 255, 255, 255]);
        let settings = WatermarkSettings {
            scale: 0.25,
            margin_px: 0,
        };
        let out = apply_watermark(&base, &mark, MarkerPosition::TopLeft, &settings).to_rgba8();

        assert_eq!(out.dimensions(), (100, 100));
        // Mark is scaled up to 25x25 and anchored at the corner.
        assert!(out.get_pixel(0, 0).0[0] >= 250);
        assert!(out.get_pixel(24, 24).0[0] >= 250);
        assert_eq!(out.get_pixel(30, 30).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(99, 99).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_apply_watermark_keeps_base_untouched() {
        let base = solid(64, 64, [10, 20, 30, 255]);
        let before = base.clone();
        let settings = WatermarkSettings::default();
        let _ = apply_watermark(&base, &default_mark(), MarkerPosition::Center, &settings);
        assert_eq!(base.as_bytes(), before.as_bytes());
    }

    #[test]
    fn test_default_mark_has_frame() {
        let mark = default_mark().to_rgba8();
        assert_eq!(mark.dimensions(), (160, 64));
        assert_eq!(mark.get_pixel(0, 0).0[3], 0xd0);
        assert!(mark.get_pixel(80, 32).0[3] < 0xd0);
    }
}
