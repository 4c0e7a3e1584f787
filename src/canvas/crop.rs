//! Recovering the working region from a generated frame.

use crate::canvas::composite::resample;
use crate::canvas::model::FrameGeometry;
use image::RgbaImage;

/// Source rectangle inside the returned image that maps onto the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub exact: bool,
}

/// Work out which part of a `returned` sized image holds the base region of
/// `frame`. Scale factors are independent per axis and the rectangle is
/// clamped to the returned image.
pub fn crop_plan(returned: (u32, u32), frame: FrameGeometry) -> CropPlan {
    let expected = frame.size();
    if returned == expected {
        return CropPlan {
            x: frame.border,
            y: frame.border,
            width: frame.base_width,
            height: frame.base_height,
            exact: true,
        };
    }

    let sx = returned.0 as f64 / expected.0.max(1) as f64;
    let sy = returned.1 as f64 / expected.1.max(1) as f64;
    let x = ((frame.border as f64 * sx).round() as u32).min(returned.0.saturating_sub(1));
    let y = ((frame.border as f64 * sy).round() as u32).min(returned.1.saturating_sub(1));
    let width = ((frame.base_width as f64 * sx).round() as u32)
        .clamp(1, returned.0.saturating_sub(x).max(1));
    let height = ((frame.base_height as f64 * sy).round() as u32)
        .clamp(1, returned.1.saturating_sub(y).max(1));
    CropPlan {
        x,
        y,
        width,
        height,
        exact: false,
    }
}

/// Cut the base region out of a generated frame, resampling to the base
/// dimensions when the generator changed the size. Never fails.
pub fn recover_crop(returned: &RgbaImage, frame: FrameGeometry) -> RgbaImage {
    let target = (frame.base_width, frame.base_height);
    if target.0 == 0 || target.1 == 0 {
        return RgbaImage::new(target.0, target.1);
    }
    if returned.width() == 0 || returned.height() == 0 {
        tracing::warn!("generated image is empty, using a blank base");
        return RgbaImage::new(target.0, target.1);
    }

    let plan = crop_plan(returned.dimensions(), frame);
    if plan.exact {
        tracing::debug!(?target, "generated frame matches, direct crop");
    } else {
        tracing::warn!(
            returned = ?returned.dimensions(),
            expected = ?frame.size(),
            ?plan,
            "generated frame size mismatch, using scaled crop"
        );
    }
    let region = image::imageops::crop_imm(returned, plan.x, plan.y, plan.width, plan.height).to_image();
    resample(&region, target.0, target.1)
}
