//! Runtime settings read from `WMARK_*` environment variables.

use std::path::PathBuf;

use tracing::debug;

use crate::models::DEFAULT_MAX_IMAGES;
use crate::watermark::{WatermarkSettings, DEFAULT_MARGIN_PX, DEFAULT_MARK_SCALE};

/// Folder created under the user's pictures directory for exports.
pub const EXPORT_DIR_NAME: &str = "WatermarkedImages";

const DEFAULT_JPEG_QUALITY: u8 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_images: usize,
    pub margin_px: u32,
    pub mark_scale: f32,
    pub jpeg_quality: u8,
    pub export_dir: PathBuf,
    /// Logo to stamp; the built-in mark is used when unset.
    pub mark_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparsable or
    /// out-of-range values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_images = read("WMARK_MAX_IMAGES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_IMAGES);

        let margin_px = read("WMARK_MARGIN_PX")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MARGIN_PX);

        let mark_scale = read("WMARK_SCALE")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|v| v.is_finite() && *v > 0.0 && *v <= 1.0)
            .unwrap_or(DEFAULT_MARK_SCALE);

        let jpeg_quality = read("WMARK_JPEG_QUALITY")
            .and_then(|v| v.parse::<u8>().ok())
            .filter(|v| (1..=100).contains(v))
            .unwrap_or(DEFAULT_JPEG_QUALITY);

        let export_dir = read("WMARK_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_export_dir);

        let mark_path = read("WMARK_LOGO").map(PathBuf::from);

        let config = Self {
            max_images,
            margin_px,
            mark_scale,
            jpeg_quality,
            export_dir,
            mark_path,
        };
        debug!(?config, "Loaded config");
        config
    }

    pub fn watermark_settings(&self) -> WatermarkSettings {
        WatermarkSettings {
            scale: self.mark_scale,
            margin_px: self.margin_px,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// `<Pictures>/WatermarkedImages`, falling back to the home directory and then
/// the working directory.
pub fn default_export_dir() -> PathBuf {
    let base = directories::UserDirs::new().and_then(|dirs| {
        dirs.picture_dir()
            .map(|p| p.to_path_buf())
            .or_else(|| Some(dirs.home_dir().to_path_buf()))
    });
    base.unwrap_or_else(|| PathBuf::from("."))
        .join(EXPORT_DIR_NAME)
}
