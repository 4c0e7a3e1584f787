use crate::canvas::error::ValidationError;
use crate::canvas::model::{FrameGeometry, Point};
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::path::Path;
use std::sync::Arc;

/// A user-supplied file: kept verbatim so references can be submitted in
/// their original encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, detecting its MIME type from the extension and
    /// falling back to the content signature.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read image file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let mime = ImageFormat::from_path(path)
            .ok()
            .or_else(|| image::guess_format(&bytes).ok())
            .map(mime_for_format)
            .unwrap_or("application/octet-stream");
        Ok(Self::new(name, mime, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn decode(&self) -> Result<RgbaImage, ValidationError> {
        if !self.is_image() {
            return Err(ValidationError::NotAnImage(self.name.clone()));
        }
        image::load_from_memory(&self.bytes)
            .map(|img| img.to_rgba8())
            .map_err(|_| ValidationError::NotAnImage(self.name.clone()))
    }

    /// Decode and shrink so the longest edge is at most `max_dim`.
    pub fn decode_bounded(&self, max_dim: u32) -> Result<RgbaImage, ValidationError> {
        Ok(downscale_to(self.decode()?, max_dim))
    }
}

pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Scale ratio = min(1, max_dim / longest edge). Never upscales.
pub fn downscale_to(image: RgbaImage, max_dim: u32) -> RgbaImage {
    let longest = image.width().max(image.height());
    if max_dim == 0 || longest <= max_dim {
        return image;
    }
    let ratio = max_dim as f32 / longest as f32;
    let w = ((image.width() as f32 * ratio).round() as u32).max(1);
    let h = ((image.height() as f32 * ratio).round() as u32).max(1);
    tracing::debug!(
        from = ?image.dimensions(),
        to = ?(w, h),
        "downscaling imported image"
    );
    image::imageops::resize(&image, w, h, image::imageops::FilterType::Triangle)
}

/// Where a drop of image files lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// No base image yet: the first file becomes the base.
    InitialBase,
    /// Dropped over the displayed base image: first file becomes a new version.
    ReplaceBase,
    /// Dropped over the border: all files become references.
    References,
}

/// Classify a drop at `display_point` (display pixels relative to the
/// canvas origin) given the displayed frame scale.
pub fn classify_drop(
    frame: Option<FrameGeometry>,
    display_point: Point,
    display_scale: f32,
) -> DropTarget {
    let Some(frame) = frame else {
        return DropTarget::InitialBase;
    };
    let scale = if display_scale > 0.0 { display_scale } else { 1.0 };
    if frame.base_contains(display_point.scaled(1.0 / scale)) {
        DropTarget::ReplaceBase
    } else {
        DropTarget::References
    }
}

/// Keep only image files, preserving order.
pub fn image_files(files: Vec<SourceFile>) -> Vec<SourceFile> {
    files
        .into_iter()
        .filter(|file| {
            let keep = file.is_image();
            if !keep {
                tracing::debug!(name = %file.name, mime = %file.mime, "ignoring non-image drop");
            }
            keep
        })
        .collect()
}
