//! Reference thumbnail placement and hit-testing.
//!
//! Positions are frame coordinates. The first `top_row_capacity` references
//! sit in a top row; the rest are pinned to a rail right of the base image,
//! whose horizontal coordinate is recomputed from the frame width on every
//! query, so only their vertical offset is durable.

use crate::canvas::composite::resample;
use crate::canvas::ingest::SourceFile;
use crate::canvas::model::Point;
use image::RgbaImage;
use std::sync::Arc;

/// Shared thumbnail geometry. Rendering, clamping and hit-testing all read
/// the same values from here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub border: u32,
    pub thumb_size: u32,
    pub margin: u32,
    pub gap: u32,
    pub top_row_capacity: usize,
    pub hit_tolerance: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            border: 160,
            thumb_size: 120,
            margin: 8,
            gap: 10,
            top_row_capacity: 3,
            hit_tolerance: 2,
        }
    }
}

impl LayoutConfig {
    pub fn is_rail_index(&self, index: usize) -> bool {
        index >= self.top_row_capacity
    }

    pub fn default_position(&self, index: usize) -> Point {
        let step = (self.thumb_size + self.gap) as f32;
        if self.is_rail_index(index) {
            let slot = (index - self.top_row_capacity) as f32;
            // x is derived from the frame width at query time
            Point::new(0.0, (self.border + self.gap) as f32 + slot * step)
        } else {
            Point::new(self.margin as f32 + index as f32 * step, self.margin as f32)
        }
    }

    pub fn rail_x(&self, frame_width: u32) -> f32 {
        frame_width as f32 - self.border as f32 + self.gap as f32
    }

    /// Clamp one axis into `[margin, extent - thumb - margin]`.
    pub fn clamp_axis(&self, value: f32, extent: u32) -> f32 {
        let lo = self.margin as f32;
        let hi = (extent as f32 - self.thumb_size as f32 - self.margin as f32).max(lo);
        value.clamp(lo, hi)
    }

    /// The origin a reference is rendered and hit-tested at.
    pub fn effective_origin(&self, index: usize, stored: Point, frame: (u32, u32)) -> Point {
        let x = if self.is_rail_index(index) {
            self.rail_x(frame.0)
        } else {
            stored.x
        };
        Point::new(self.clamp_axis(x, frame.0), self.clamp_axis(stored.y, frame.1))
    }
}

/// Scale `bitmap` so its longest side equals `size`, keeping aspect ratio.
pub fn fit_thumbnail(bitmap: &RgbaImage, size: u32) -> RgbaImage {
    let longest = bitmap.width().max(bitmap.height());
    if longest == 0 || size == 0 {
        return RgbaImage::new(0, 0);
    }
    let r = size as f32 / longest as f32;
    let tw = ((bitmap.width() as f32 * r).round() as u32).max(1);
    let th = ((bitmap.height() as f32 * r).round() as u32).max(1);
    resample(bitmap, tw, th)
}

#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub bitmap: Arc<RgbaImage>,
    /// `bitmap` fitted to the thumbnail square once, at insertion.
    pub thumbnail: Arc<RgbaImage>,
    pub owner_file: SourceFile,
    pub position: Point,
}

/// Ordered reference images. Later entries draw on top and win hit-test ties.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    items: Vec<ReferenceImage>,
}

impl ReferenceSet {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ReferenceImage> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceImage> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Append a reference at its default slot and return its index.
    pub fn push(&mut self, config: &LayoutConfig, bitmap: RgbaImage, owner_file: SourceFile) -> usize {
        let index = self.items.len();
        self.items.push(ReferenceImage {
            thumbnail: Arc::new(fit_thumbnail(&bitmap, config.thumb_size)),
            bitmap: Arc::new(bitmap),
            owner_file,
            position: config.default_position(index),
        });
        index
    }

    pub fn origin(&self, config: &LayoutConfig, index: usize, frame: (u32, u32)) -> Option<Point> {
        let item = self.items.get(index)?;
        Some(config.effective_origin(index, item.position, frame))
    }

    /// Store a dragged position. Rail items only keep the vertical component.
    pub fn move_to(&mut self, config: &LayoutConfig, index: usize, origin: Point, frame: (u32, u32)) {
        let Some(item) = self.items.get_mut(index) else {
            return;
        };
        let y = config.clamp_axis(origin.y, frame.1);
        if config.is_rail_index(index) {
            item.position.y = y;
        } else {
            item.position = Point::new(config.clamp_axis(origin.x, frame.0), y);
        }
    }

    /// Topmost reference whose thumbnail square (plus tolerance) contains
    /// `point`.
    pub fn hit_test(&self, config: &LayoutConfig, point: Point, frame: (u32, u32)) -> Option<usize> {
        let size = config.thumb_size as f32;
        let tol = config.hit_tolerance as f32;
        (0..self.items.len()).rev().find(|&index| {
            let origin = config.effective_origin(index, self.items[index].position, frame);
            point.x >= origin.x - tol
                && point.x <= origin.x + size + tol
                && point.y >= origin.y - tol
                && point.y <= origin.y + size + tol
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.items.iter().map(|item| &item.owner_file)
    }
}
