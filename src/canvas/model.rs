use crate::canvas::color::Rgb;
use image::RgbaImage;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingStyle {
    pub tool: Tool,
    pub color: Rgb,
    pub opacity_percent: u8,
    pub stroke_width: u32,
}

impl DrawingStyle {
    pub fn new(color: Rgb, stroke_width: u32) -> Self {
        Self {
            tool: Tool::Pen,
            color,
            opacity_percent: 100,
            stroke_width: stroke_width.max(1),
        }
    }

    pub fn set_opacity(&mut self, percent: u8) {
        self.opacity_percent = percent.min(100);
    }

    pub fn set_stroke_width(&mut self, width: u32) {
        self.stroke_width = width.max(1);
    }
}

impl Default for DrawingStyle {
    fn default() -> Self {
        Self::new(Rgb::WHITE, 3)
    }
}

/// An immutable raster: the captured photo or a generated/edited result.
///
/// Cloning shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingImage(Arc<RgbaImage>);

impl WorkingImage {
    pub fn new(image: RgbaImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    pub fn same_buffer(&self, other: &WorkingImage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<RgbaImage> for WorkingImage {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

/// Base image dimensions plus a symmetric border. All reference and crop
/// geometry is relative to the frame this describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub border: u32,
}

impl FrameGeometry {
    pub fn new(base_width: u32, base_height: u32, border: u32) -> Self {
        Self {
            base_width,
            base_height,
            border,
        }
    }

    pub fn width(&self) -> u32 {
        self.base_width + self.border * 2
    }

    pub fn height(&self) -> u32 {
        self.base_height + self.border * 2
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Whether `point` (frame coordinates) lies on the base image region.
    pub fn base_contains(&self, point: Point) -> bool {
        let b = self.border as f32;
        point.x >= b
            && point.y >= b
            && point.x <= b + self.base_width as f32
            && point.y <= b + self.base_height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_adds_border_on_both_sides() {
        let frame = FrameGeometry::new(640, 480, 160);
        assert_eq!(frame.size(), (960, 800));
    }

    #[test]
    fn base_region_excludes_border() {
        let frame = FrameGeometry::new(100, 50, 10);
        assert!(frame.base_contains(Point::new(10.0, 10.0)));
        assert!(frame.base_contains(Point::new(110.0, 60.0)));
        assert!(!frame.base_contains(Point::new(9.0, 30.0)));
        assert!(!frame.base_contains(Point::new(50.0, 61.0)));
    }

    #[test]
    fn style_setters_clamp_inputs() {
        let mut style = DrawingStyle::default();
        style.set_opacity(180);
        style.set_stroke_width(0);
        assert_eq!(style.opacity_percent, 100);
        assert_eq!(style.stroke_width, 1);
    }
}
