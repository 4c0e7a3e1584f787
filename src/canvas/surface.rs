//! Composite surface: base image, border, reference thumbnails and the ink
//! layer, kept fitted to the viewport and device pixel ratio.
//!
//! Three coordinate spaces are in play:
//! * display: what the pointer reports, the frame scaled by `display_scale`;
//! * frame: 1× composite pixels, used by layout, hit-testing and crop;
//! * backing: frame × device pixel ratio, used by the ink layer.

use crate::canvas::composite::{draw_image_at, flatten, resample};
use crate::canvas::ink::InkLayer;
use crate::canvas::layout::{LayoutConfig, ReferenceSet};
use crate::canvas::model::{FrameGeometry, Point, WorkingImage};
use crate::canvas::render::{fill_rect, stroke_rect, BlendMode, DirtyRect};
use image::{Rgba, RgbaImage};

const PANE: Rgba<u8> = Rgba([0x14, 0x14, 0x16, 0xff]);
const MAT: Rgba<u8> = Rgba([0x0b, 0x0b, 0x0c, 0xff]);
const OUTLINE: Rgba<u8> = Rgba([0x2a, 0x2a, 0x2d, 0xff]);
const TILE: Rgba<u8> = Rgba([0x10, 0x10, 0x12, 0xff]);
const ACCENT: Rgba<u8> = Rgba([0x8b, 0x5c, 0xf6, 0xff]);
const DRAG_OVERLAY: Rgba<u8> = Rgba([0x8b, 0x5c, 0xf6, 77]);
const HOVER_OVERLAY: Rgba<u8> = Rgba([0x8b, 0x5c, 0xf6, 38]);
const MAT_INSET: i32 = 4;

pub const MIN_DEVICE_PIXEL_RATIO: f32 = 0.25;
pub const MAX_DEVICE_PIXEL_RATIO: f32 = 8.0;

/// Window widths below this use the compact chrome insets.
pub const NARROW_WINDOW_WIDTH: u32 = 768;

/// Space left for the canvas once surrounding chrome is subtracted from the
/// window.
pub fn available_viewport(window_width: u32, window_height: u32) -> (u32, u32) {
    let (inset_w, inset_h) = if window_width < NARROW_WINDOW_WIDTH {
        (24, 140)
    } else {
        (100, 200)
    };
    (
        window_width.saturating_sub(inset_w),
        window_height.saturating_sub(inset_h),
    )
}

/// Display scale that fits `frame` inside `viewport` without upscaling.
pub fn fit_scale(frame: (u32, u32), viewport: (u32, u32)) -> f32 {
    if frame.0 == 0 || frame.1 == 0 {
        return 1.0;
    }
    let sx = viewport.0 as f32 / frame.0 as f32;
    let sy = viewport.1 as f32 / frame.1 as f32;
    1.0_f32.min(sx).min(sy)
}

/// Which thumbnail, if any, is drawn with interaction styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailHighlight {
    #[default]
    None,
    Hovered(usize),
    Dragged(usize),
}

pub struct SurfaceManager {
    layout: LayoutConfig,
    base: Option<WorkingImage>,
    references: ReferenceSet,
    ink: InkLayer,
    composite: RgbaImage,
    viewport: Option<(u32, u32)>,
    device_pixel_ratio: f32,
    display_scale: f32,
    highlight: ThumbnailHighlight,
}

impl SurfaceManager {
    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            layout,
            base: None,
            references: ReferenceSet::default(),
            ink: InkLayer::new(0, 0),
            composite: RgbaImage::new(0, 0),
            viewport: None,
            device_pixel_ratio: 1.0,
            display_scale: 1.0,
            highlight: ThumbnailHighlight::None,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn base(&self) -> Option<&WorkingImage> {
        self.base.as_ref()
    }

    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub fn frame(&self) -> Option<FrameGeometry> {
        self.base
            .as_ref()
            .map(|base| FrameGeometry::new(base.width(), base.height(), self.layout.border))
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut ReferenceSet {
        &mut self.references
    }

    pub fn ink(&self) -> &InkLayer {
        &self.ink
    }

    pub fn ink_mut(&mut self) -> &mut InkLayer {
        &mut self.ink
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    pub fn display_scale(&self) -> f32 {
        self.display_scale
    }

    pub fn highlight(&self) -> ThumbnailHighlight {
        self.highlight
    }

    /// Display size of the frame in whole pixels.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        let frame = self.frame()?;
        Some((
            (frame.width() as f32 * self.display_scale).round() as u32,
            (frame.height() as f32 * self.display_scale).round() as u32,
        ))
    }

    /// Backing-store size: frame dimensions × device pixel ratio.
    pub fn backing_size(&self) -> Option<(u32, u32)> {
        let frame = self.frame()?;
        Some((
            (frame.width() as f32 * self.device_pixel_ratio).round() as u32,
            (frame.height() as f32 * self.device_pixel_ratio).round() as u32,
        ))
    }

    /// The rendered composite (pre-ink) at frame size.
    pub fn composite(&self) -> Option<&RgbaImage> {
        self.base.as_ref().map(|_| &self.composite)
    }

    pub fn display_to_frame(&self, display: Point) -> Point {
        display.scaled(1.0 / self.display_scale.max(f32::EPSILON))
    }

    pub fn frame_to_backing(&self, frame: Point) -> Point {
        frame.scaled(self.device_pixel_ratio)
    }

    /// Install a new base image and re-fit. References and ink are kept; the
    /// caller decides whether the ink should be cleared.
    pub fn set_base(&mut self, image: WorkingImage) {
        tracing::debug!(size = ?image.dimensions(), "base image set");
        self.base = Some(image);
        self.refit();
    }

    /// Drop the base, references, ink and highlight.
    pub fn reset(&mut self) {
        self.base = None;
        self.references.clear();
        self.ink = InkLayer::new(0, 0);
        self.composite = RgbaImage::new(0, 0);
        self.highlight = ThumbnailHighlight::None;
        self.display_scale = 1.0;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
        self.refit();
    }

    /// Non-finite or non-positive ratios fall back to 1; others are clamped
    /// to `MIN_DEVICE_PIXEL_RATIO..=MAX_DEVICE_PIXEL_RATIO`.
    pub fn set_device_pixel_ratio(&mut self, ratio: f32) {
        self.device_pixel_ratio = if ratio.is_finite() && ratio > 0.0 {
            ratio.clamp(MIN_DEVICE_PIXEL_RATIO, MAX_DEVICE_PIXEL_RATIO)
        } else {
            1.0
        };
        self.refit();
    }

    pub fn set_highlight(&mut self, highlight: ThumbnailHighlight) {
        if self.highlight != highlight {
            self.highlight = highlight;
            self.render();
        }
    }

    /// Recompute display scale and backing size, carrying ink across any
    /// backing-size change, then redraw.
    pub fn refit(&mut self) {
        let Some(frame) = self.frame() else {
            return;
        };
        self.display_scale = match self.viewport {
            Some(viewport) => fit_scale(frame.size(), viewport),
            None => 1.0,
        };
        if let Some((w, h)) = self.backing_size() {
            self.ink.resize_preserving(w, h);
        }
        self.render();
    }

    /// Redraw the composite: pane, inner mat, base, thumbnails, outline.
    pub fn render(&mut self) {
        let Some(base) = self.base.as_ref() else {
            return;
        };
        let frame = FrameGeometry::new(base.width(), base.height(), self.layout.border);
        let (w, h) = frame.size();
        let border = self.layout.border as i32;

        let mut out = RgbaImage::from_pixel(w, h, PANE);
        fill_rect(
            &mut out,
            DirtyRect {
                x: border - MAT_INSET,
                y: border - MAT_INSET,
                width: base.width() as i32 + MAT_INSET * 2,
                height: base.height() as i32 + MAT_INSET * 2,
            },
            MAT,
            BlendMode::Copy,
        );
        draw_image_at(&mut out, base.pixels(), border as i64, border as i64);

        for (index, reference) in self.references.iter().enumerate() {
            let origin = self.layout.effective_origin(index, reference.position, (w, h));
            let state = match self.highlight {
                ThumbnailHighlight::Dragged(i) if i == index => ThumbnailHighlight::Dragged(i),
                ThumbnailHighlight::Hovered(i) if i == index => ThumbnailHighlight::Hovered(i),
                _ => ThumbnailHighlight::None,
            };
            draw_thumbnail(&mut out, &reference.thumbnail, origin, self.layout.thumb_size, state);
        }

        stroke_rect(
            &mut out,
            DirtyRect { x: 0, y: 0, width: w as i32, height: h as i32 },
            OUTLINE,
            1,
        );
        self.composite = out;
    }

    /// Opaque composite with ink merged, at 1× frame size.
    pub fn flatten(&self) -> Option<RgbaImage> {
        self.base.as_ref()?;
        Some(flatten(&self.composite, self.ink.pixels()))
    }

    /// What the viewer shows: composite and ink at backing resolution.
    pub fn display_image(&self) -> Option<RgbaImage> {
        let (w, h) = self.backing_size()?;
        let mut out = resample(&self.composite, w, h);
        draw_image_at(&mut out, self.ink.pixels(), 0, 0);
        Some(out)
    }
}

fn draw_thumbnail(
    out: &mut RgbaImage,
    thumbnail: &RgbaImage,
    origin: Point,
    size: u32,
    state: ThumbnailHighlight,
) {
    let x = origin.x.round() as i32;
    let y = origin.y.round() as i32;
    let side = size as i32;
    let tile = DirtyRect { x, y, width: side, height: side };
    fill_rect(out, tile, TILE, BlendMode::Copy);

    if thumbnail.width() > 0 && thumbnail.height() > 0 {
        let ox = x + ((size as f32 - thumbnail.width() as f32) / 2.0).round() as i32;
        let oy = y + ((size as f32 - thumbnail.height() as f32) / 2.0).round() as i32;
        draw_image_at(out, thumbnail, ox as i64, oy as i64);
    }

    match state {
        ThumbnailHighlight::Dragged(_) => {
            fill_rect(out, tile, DRAG_OVERLAY, BlendMode::SourceOver);
            stroke_rect(out, tile, ACCENT, 2);
        }
        ThumbnailHighlight::Hovered(_) => {
            fill_rect(out, tile, HOVER_OVERLAY, BlendMode::SourceOver);
            stroke_rect(out, tile, ACCENT, 2);
        }
        ThumbnailHighlight::None => stroke_rect(out, tile, OUTLINE, 1),
    }
}
