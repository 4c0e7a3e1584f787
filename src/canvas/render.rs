use image::{Rgba, RgbaImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn from_points(a: (f32, f32), b: (f32, f32), pad: f32) -> Self {
        let min_x = (a.0.min(b.0) - pad).floor() as i32;
        let max_x = (a.0.max(b.0) + pad).ceil() as i32;
        let min_y = (a.1.min(b.1) - pad).floor() as i32;
        let max_y = (a.1.max(b.1) + pad).ceil() as i32;
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1).max(1),
            height: (max_y - min_y + 1).max(1),
        }
    }

    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// How a painted pixel combines with what is already in the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Replace the destination pixel.
    Copy,
    /// Standard "over" compositing of straight-alpha colour.
    SourceOver,
    /// Remove destination alpha in proportion to source alpha.
    DestinationOut,
}

pub fn blend_pixel(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let sa = top[3] as f32 / 255.0;
    let da = bottom[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a <= f32::EPSILON {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

pub fn erase_pixel(bottom: Rgba<u8>, eraser_alpha: u8) -> Rgba<u8> {
    let keep = 1.0 - eraser_alpha as f32 / 255.0;
    let a = (bottom[3] as f32 * keep).round() as u8;
    if a == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([bottom[0], bottom[1], bottom[2], a])
    }
}

pub fn paint_pixel(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, mode: BlendMode) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let px = image.get_pixel_mut(x as u32, y as u32);
    *px = match mode {
        BlendMode::Copy => color,
        BlendMode::SourceOver => blend_pixel(*px, color),
        BlendMode::DestinationOut => erase_pixel(*px, color[3]),
    };
}

pub fn fill_rect(image: &mut RgbaImage, rect: DirtyRect, color: Rgba<u8>, mode: BlendMode) {
    let Some(rect) = rect.clamp(image.width(), image.height()) else {
        return;
    };
    for y in rect.y..(rect.y + rect.height) {
        for x in rect.x..(rect.x + rect.width) {
            paint_pixel(image, x, y, color, mode);
        }
    }
}

/// Inset outline of `rect`, `line_width` pixels thick.
pub fn stroke_rect(image: &mut RgbaImage, rect: DirtyRect, color: Rgba<u8>, line_width: i32) {
    let lw = line_width.max(1).min(rect.width).min(rect.height);
    let edges = [
        DirtyRect { x: rect.x, y: rect.y, width: rect.width, height: lw },
        DirtyRect { x: rect.x, y: rect.y + rect.height - lw, width: rect.width, height: lw },
        DirtyRect { x: rect.x, y: rect.y + lw, width: lw, height: rect.height - 2 * lw },
        DirtyRect { x: rect.x + rect.width - lw, y: rect.y + lw, width: lw, height: rect.height - 2 * lw },
    ];
    for edge in edges {
        if edge.width > 0 && edge.height > 0 {
            fill_rect(image, edge, color, BlendMode::SourceOver);
        }
    }
}

fn point_segment_distance_sq(point: (f32, f32), start: (f32, f32), end: (f32, f32)) -> f32 {
    let (px, py) = point;
    let (x0, y0) = start;
    let vx = end.0 - x0;
    let vy = end.1 - y0;
    let wx = px - x0;
    let wy = py - y0;
    let len_sq = vx * vx + vy * vy;
    if len_sq <= f32::EPSILON {
        return wx * wx + wy * wy;
    }
    let t = ((wx * vx + wy * vy) / len_sq).clamp(0.0, 1.0);
    let dx = px - (x0 + vx * t);
    let dy = py - (y0 + vy * t);
    dx * dx + dy * dy
}

/// Rasterise a round-capped segment of the given width. Returns the number
/// of pixels written.
pub fn draw_segment_capsule(
    image: &mut RgbaImage,
    start: (f32, f32),
    end: (f32, f32),
    stroke_width: f32,
    color: Rgba<u8>,
    mode: BlendMode,
) -> u64 {
    let radius = (stroke_width * 0.5).max(0.5);
    let bounds = DirtyRect::from_points(start, end, radius + 1.0);
    let Some(clip) = bounds.clamp(image.width(), image.height()) else {
        return 0;
    };

    let radius_sq = radius * radius;
    let mut writes: u64 = 0;
    for y in clip.y..(clip.y + clip.height) {
        for x in clip.x..(clip.x + clip.width) {
            let center = (x as f32 + 0.5, y as f32 + 0.5);
            if point_segment_distance_sq(center, start, end) <= radius_sq {
                paint_pixel(image, x, y, color, mode);
                writes = writes.saturating_add(1);
            }
        }
    }
    writes
}

/// A filled disc of the given diameter.
pub fn draw_dot(
    image: &mut RgbaImage,
    center: (f32, f32),
    diameter: f32,
    color: Rgba<u8>,
    mode: BlendMode,
) -> u64 {
    draw_segment_capsule(image, center, center, diameter, color, mode)
}
