use crate::canvas::composite::resample;
use crate::canvas::model::{DrawingStyle, Point, Tool};
use crate::canvas::render::{draw_dot, draw_segment_capsule, BlendMode};
use image::{Rgba, RgbaImage};

/// Transparent freehand layer at backing-store resolution. Drawn above the
/// composite; nothing is drawn above it.
#[derive(Debug, Clone, PartialEq)]
pub struct InkLayer {
    pixels: RgbaImage,
}

impl InkLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|px| px[3] == 0)
    }

    /// Resize the backing store, redrawing existing ink scaled onto the new
    /// store. Returns `false` (and copies nothing) when the size is unchanged.
    pub fn resize_preserving(&mut self, width: u32, height: u32) -> bool {
        if self.pixels.dimensions() == (width, height) {
            return false;
        }
        let snapshot = std::mem::replace(&mut self.pixels, RgbaImage::new(width, height));
        if width == 0 || height == 0 || snapshot.width() == 0 || snapshot.height() == 0 {
            return true;
        }
        if snapshot.pixels().any(|px| px[3] != 0) {
            self.pixels = resample(&snapshot, width, height);
        }
        tracing::debug!(
            from = ?snapshot.dimensions(),
            to = ?(width, height),
            "ink layer resized with snapshot restore"
        );
        true
    }

    /// Mark the origin of a stroke so a tap without movement stays visible.
    pub fn stroke_start(&mut self, at: Point, style: &DrawingStyle, device_pixel_ratio: f32) {
        let (color, mode) = paint_for(style);
        draw_dot(
            &mut self.pixels,
            (at.x, at.y),
            scaled_width(style, device_pixel_ratio),
            color,
            mode,
        );
    }

    pub fn stroke_segment(&mut self, from: Point, to: Point, style: &DrawingStyle, device_pixel_ratio: f32) {
        let (color, mode) = paint_for(style);
        draw_segment_capsule(
            &mut self.pixels,
            (from.x, from.y),
            (to.x, to.y),
            scaled_width(style, device_pixel_ratio),
            color,
            mode,
        );
    }
}

fn scaled_width(style: &DrawingStyle, device_pixel_ratio: f32) -> f32 {
    style.stroke_width.max(1) as f32 * device_pixel_ratio.max(0.1)
}

fn paint_for(style: &DrawingStyle) -> (Rgba<u8>, BlendMode) {
    match style.tool {
        Tool::Pen => (
            Rgba(style.color.with_opacity(style.opacity_percent)),
            BlendMode::SourceOver,
        ),
        Tool::Eraser => (Rgba([0, 0, 0, 255]), BlendMode::DestinationOut),
    }
}
