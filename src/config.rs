//! Engine and logging configuration.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Environment override for the per-video decoded-frame cache capacity.
pub const VIDEO_CACHE_CAPACITY_ENV: &str = "REELKIT_VIDEO_CACHE_CAPACITY";

/// Engine-wide settings shared by import, preview and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeline frame rate.
    pub fps: Fps,
    /// Preview canvas size. Item draw geometry is expressed against this canvas.
    pub preview: Canvas,
    /// Output canvas = preview x ratio.
    pub output_ratio: f64,
    /// Default span of a freshly created text item, in frames.
    pub text_default_frames: u64,
    /// Default span of an imported still image, in frames.
    pub image_default_frames: u64,
    /// Earliest probe offset for video frames, in frames. Leading frames may decode empty.
    pub min_probe_frames: u64,
    /// Number of thumbnails generated per video source.
    pub thumbnail_count: usize,
    /// Spacing between thumbnails in microseconds.
    pub thumbnail_step_us: u64,
    /// Decoded frames retained per video handle.
    pub video_frame_cache: usize,
    /// Root directory of the filesystem byte store.
    pub store_root: PathBuf,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info", "reelkit=debug,warn").
    pub level: String,
    /// Emit structured JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            preview: Canvas {
                width: 1080,
                height: 1920,
            },
            output_ratio: 1.0,
            text_default_frames: 30 * 60,
            image_default_frames: 30 * 5,
            min_probe_frames: 5,
            thumbnail_count: 50,
            thumbnail_step_us: 1_000_000,
            video_frame_cache: 64,
            store_root: PathBuf::from(".reelkit/store"),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from a JSON reader. Missing fields take their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse engine config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg.with_env_overrides())
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Apply environment overrides on top of file/default values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(n) = std::env::var(VIDEO_CACHE_CAPACITY_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.video_frame_cache = n;
        }
        self
    }

    pub fn validate(&self) -> ReelResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(ReelError::validation("preview canvas must be non-empty"));
        }
        if !self.output_ratio.is_finite() || self.output_ratio <= 0.0 {
            return Err(ReelError::validation("output_ratio must be finite and > 0"));
        }
        if self.thumbnail_step_us == 0 {
            return Err(ReelError::validation("thumbnail_step_us must be > 0"));
        }
        Ok(())
    }

    /// Output canvas derived from the preview canvas and `output_ratio`.
    pub fn output(&self) -> Canvas {
        self.preview.scaled(self.output_ratio)
    }

    /// Minimum video probe timestamp in microseconds.
    pub fn min_probe_us(&self) -> u64 {
        self.fps.frames_to_micros(self.min_probe_frames)
    }
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.level` when set. Calling this twice is harmless.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
