use crate::canvas::render::blend_pixel;
use image::imageops::FilterType;
use image::{ImageOutputFormat, RgbaImage};
use std::io::Cursor;

/// Source-over `top` onto `base` with `top`'s origin at `(dst_x, dst_y)`.
/// Pixels falling outside `base` are dropped.
pub fn draw_image_at(base: &mut RgbaImage, top: &RgbaImage, dst_x: i64, dst_y: i64) {
    let (bw, bh) = (base.width() as i64, base.height() as i64);
    for (x, y, src) in top.enumerate_pixels() {
        if src[3] == 0 {
            continue;
        }
        let tx = dst_x + x as i64;
        let ty = dst_y + y as i64;
        if tx < 0 || ty < 0 || tx >= bw || ty >= bh {
            continue;
        }
        let dst = base.get_pixel_mut(tx as u32, ty as u32);
        *dst = blend_pixel(*dst, *src);
    }
}

/// Resample `image` to exactly `width`×`height`, returning a clone when the
/// size already matches.
pub fn resample(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width.max(1), height.max(1), FilterType::Triangle)
}

/// Blend `top` over `base` after resampling `top` to `base`'s size.
pub fn composite_layer_over(base: &mut RgbaImage, top: &RgbaImage) {
    let top = resample(top, base.width(), base.height());
    for (dst, src) in base.pixels_mut().zip(top.pixels()) {
        if src[3] == 0 {
            continue;
        }
        *dst = blend_pixel(*dst, *src);
    }
}

/// Merge an opaque composite and an ink layer into a single 1× raster the
/// size of `composite`.
pub fn flatten(composite: &RgbaImage, ink: &RgbaImage) -> RgbaImage {
    let mut out = composite.clone();
    for px in out.pixels_mut() {
        px[3] = 255;
    }
    composite_layer_over(&mut out, ink);
    out
}

pub fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn flatten_blends_half_alpha_ink_over_composite() {
        let composite = RgbaImage::from_pixel(2, 1, Rgba([100, 100, 100, 255]));
        let mut ink = RgbaImage::new(2, 1);
        ink.put_pixel(0, 0, Rgba([200, 0, 0, 128]));

        let out = flatten(&composite, &ink);
        assert_eq!(out.get_pixel(0, 0), &Rgba([150, 50, 50, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn flatten_downsamples_high_dpi_ink_to_composite_size() {
        let composite = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let ink = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));

        let out = flatten(&composite, &ink);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(2, 2), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn draw_image_at_clips_negative_origin() {
        let mut base = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        let top = RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]));
        draw_image_at(&mut base, &top, -1, -1);
        assert_eq!(base.get_pixel(0, 0), &Rgba([9, 9, 9, 255]));
        assert_eq!(base.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn encoded_png_decodes_to_same_pixels() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&image).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(back, image);
    }
}
