use crate::canvas::color::Rgb;
use crate::canvas::layout::LayoutConfig;
use crate::canvas::model::DrawingStyle;
use crate::canvas::session::SessionConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeationSettings {
    #[serde(default = "default_border_width")]
    pub border_width: u32,
    /// Imported photos are downscaled so the longest edge fits.
    #[serde(default = "default_max_base_dimension")]
    pub max_base_dimension: u32,
    #[serde(default = "default_max_reference_dimension")]
    pub max_reference_dimension: u32,
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    #[serde(default = "default_thumbnail_margin")]
    pub thumbnail_margin: u32,
    #[serde(default = "default_thumbnail_gap")]
    pub thumbnail_gap: u32,
    /// Number of references laid out in the top row before the side rail.
    #[serde(default = "default_top_row_capacity")]
    pub top_row_capacity: usize,
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: u32,
    #[serde(default = "default_stroke_width")]
    pub default_stroke_width: u32,
    #[serde(default)]
    pub default_color: Rgb,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where exports and share fallbacks are written. Defaults to the
    /// user's picture folder.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    /// When enabled the logger is initialised at debug level.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_border_width() -> u32 {
    160
}

fn default_max_base_dimension() -> u32 {
    2048
}

fn default_max_reference_dimension() -> u32 {
    512
}

fn default_thumbnail_size() -> u32 {
    120
}

fn default_thumbnail_margin() -> u32 {
    8
}

fn default_thumbnail_gap() -> u32 {
    10
}

fn default_top_row_capacity() -> usize {
    3
}

fn default_hit_tolerance() -> u32 {
    2
}

fn default_stroke_width() -> u32 {
    3
}

fn default_endpoint() -> String {
    "http://localhost:3000/api/generate-image".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for IdeationSettings {
    fn default() -> Self {
        Self {
            border_width: default_border_width(),
            max_base_dimension: default_max_base_dimension(),
            max_reference_dimension: default_max_reference_dimension(),
            thumbnail_size: default_thumbnail_size(),
            thumbnail_margin: default_thumbnail_margin(),
            thumbnail_gap: default_thumbnail_gap(),
            top_row_capacity: default_top_row_capacity(),
            hit_tolerance: default_hit_tolerance(),
            default_stroke_width: default_stroke_width(),
            default_color: Rgb::WHITE,
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            export_dir: None,
            debug_logging: false,
        }
    }
}

impl IdeationSettings {
    /// Pull out-of-range values back to something usable.
    pub fn sanitize(&mut self) {
        self.thumbnail_size = self.thumbnail_size.max(1);
        self.max_base_dimension = self.max_base_dimension.max(1);
        self.max_reference_dimension = self.max_reference_dimension.max(1);
        self.default_stroke_width = self.default_stroke_width.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        if self.endpoint.trim().is_empty() {
            self.endpoint = default_endpoint();
        }
    }

    pub fn layout(&self) -> LayoutConfig {
        LayoutConfig {
            border: self.border_width,
            thumb_size: self.thumbnail_size,
            margin: self.thumbnail_margin,
            gap: self.thumbnail_gap,
            top_row_capacity: self.top_row_capacity,
            hit_tolerance: self.hit_tolerance,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            layout: self.layout(),
            max_base_dimension: self.max_base_dimension,
            max_reference_dimension: self.max_reference_dimension,
            default_style: DrawingStyle::new(self.default_color, self.default_stroke_width),
            export_dir: self.export_dir.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

/// Missing or blank files yield defaults.
pub fn load_from_path(path: &Path) -> Result<IdeationSettings> {
    if !path.exists() {
        return Ok(IdeationSettings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(IdeationSettings::default());
    }
    let mut loaded: IdeationSettings = serde_json::from_str(&content)
        .with_context(|| format!("deserialize settings file {}", path.display()))?;
    loaded.sanitize();
    Ok(loaded)
}

pub fn save_to_path(path: &Path, settings: &IdeationSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create settings parent folder {}", parent.display()))?;
    }
    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize settings")?;
    std::fs::write(path, json).with_context(|| format!("write settings file {}", path.display()))
}

/// Load from `explicit` when given, otherwise from next to the executable.
pub fn load(explicit: Option<&Path>) -> Result<IdeationSettings> {
    match explicit {
        Some(path) => load_from_path(path),
        None => load_from_path(&resolve_settings_path()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_path_is_resolved_next_to_executable() {
        let exe = Path::new("/tmp/ideation/bin/ideation-canvas");
        let path = settings_path_from_exe_path(exe).expect("path");
        assert_eq!(path, Path::new("/tmp/ideation/bin").join(SETTINGS_FILE_NAME));
    }

    #[test]
    fn missing_and_blank_files_load_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        assert_eq!(load_from_path(&path).expect("missing"), IdeationSettings::default());

        std::fs::write(&path, "  \n").expect("write blank");
        assert_eq!(load_from_path(&path).expect("blank"), IdeationSettings::default());
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, r##"{"border_width": 40, "default_color": "#ff8800"}"##)
            .expect("write");

        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.border_width, 40);
        assert_eq!(loaded.default_color, Rgb::new(0xff, 0x88, 0x00));
        assert_eq!(loaded.thumbnail_size, 120);
        assert_eq!(loaded.endpoint, default_endpoint());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);
        let settings = IdeationSettings {
            thumbnail_size: 96,
            export_dir: Some(PathBuf::from("/tmp/exports")),
            debug_logging: true,
            ..IdeationSettings::default()
        };
        save_to_path(&path, &settings).expect("save");
        assert_eq!(load_from_path(&path).expect("load"), settings);
    }

    #[test]
    fn invalid_json_reports_path_in_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("deserialize settings file"));
    }

    #[test]
    fn sanitize_repairs_zero_values() {
        let mut settings = IdeationSettings {
            thumbnail_size: 0,
            default_stroke_width: 0,
            endpoint: " ".into(),
            ..IdeationSettings::default()
        };
        settings.sanitize();
        assert_eq!(settings.thumbnail_size, 1);
        assert_eq!(settings.default_stroke_width, 1);
        assert_eq!(settings.endpoint, default_endpoint());
    }

    #[test]
    fn session_config_shares_layout_values() {
        let settings = IdeationSettings {
            thumbnail_size: 80,
            border_width: 100,
            ..IdeationSettings::default()
        };
        let config = settings.session_config();
        assert_eq!(config.layout.thumb_size, 80);
        assert_eq!(config.layout.border, 100);
        assert_eq!(config.default_style.stroke_width, 3);
    }
}
