use crate::canvas::composite::encode_png;
use crate::canvas::error::ResourceError;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::RgbaImage;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

pub const DESIGN_EXPORT_PREFIX: &str = "ideation-design";
pub const VERSION_EXPORT_PREFIX: &str = "generation";

/// Explicit directory, else the user's picture folder, else the working
/// directory.
pub fn resolve_output_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    dirs_next::picture_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn timestamped_filename(prefix: &str, now: DateTime<Local>) -> String {
    format!("{}-{}.png", prefix, now.timestamp_millis())
}

pub fn write_png(path: &Path, image: &RgbaImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create export folder {}", parent.display()))?;
    }
    let bytes = encode_png(image).context("encode png")?;
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

/// Write `image` as `<prefix>-<millis>.png` into `dir`.
pub fn export_image(
    dir: &Path,
    prefix: &str,
    image: &RgbaImage,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = dir.join(timestamped_filename(prefix, now));
    write_png(&path, image)?;
    tracing::info!(path = %path.display(), "exported image");
    Ok(path)
}

pub trait ImageClipboard {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), ResourceError>;
}

/// The desktop clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ImageClipboard for SystemClipboard {
    fn set_image(&mut self, image: &RgbaImage) -> Result<(), ResourceError> {
        let mut cb = arboard::Clipboard::new()
            .map_err(|err| ResourceError::ClipboardUnsupported(err.to_string()))?;
        cb.set_image(arboard::ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        })
        .map_err(|err| ResourceError::ClipboardUnsupported(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    Copied,
    /// Clipboard write failed; the image was saved here instead.
    Saved(PathBuf),
}

/// Copy to the clipboard, falling back to a file export.
pub fn share_image(
    clipboard: &mut dyn ImageClipboard,
    image: &RgbaImage,
    dir: &Path,
    now: DateTime<Local>,
) -> Result<ShareOutcome> {
    match clipboard.set_image(image) {
        Ok(()) => Ok(ShareOutcome::Copied),
        Err(err) => {
            tracing::warn!(error = %err, "clipboard share failed, saving file instead");
            export_image(dir, DESIGN_EXPORT_PREFIX, image, now).map(ShareOutcome::Saved)
        }
    }
}
