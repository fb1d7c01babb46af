//! Configuration management for imgcompress

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CompressError, Result};

pub mod options;
pub use options::*;

/// Main configuration structure, loaded from an optional TOML or YAML file.
///
/// Every field has a default so a partial file (or none at all) is valid.
/// Command-line flags take precedence over anything set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults for per-run processing parameters
    pub processing: ProcessingConfig,

    /// Progress monitor settings
    pub monitor: MonitorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Defaults applied when the matching flag is absent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Encode quality (1-100)
    pub quality: Option<u8>,

    /// Worker count cap (None = hardware concurrency)
    pub threads: Option<usize>,
}

/// Progress monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Draw the progress bar at all
    pub enabled: bool,

    /// Polling cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Width of the bar in terminal columns
    pub bar_width: u16,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 50,
            bar_width: 40,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Resize policy, decided once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Scale both sides by a percentage
    Percentage { percent: u32 },

    /// Resize to specific width, keep aspect ratio
    Width { width: u32 },

    /// Resize to specific height, keep aspect ratio
    Height { height: u32 },
}

impl ResizeMode {
    /// The numeric value of the active parameter, as used in output names
    pub fn size_token(self) -> u32 {
        match self {
            Self::Percentage { percent } => percent,
            Self::Width { width } => width,
            Self::Height { height } => height,
        }
    }
}

impl Default for ResizeMode {
    fn default() -> Self {
        Self::Percentage { percent: 100 }
    }
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Whether `quality` affects the encoded output
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CompressError::config(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let config: Config = match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => {
                return Err(CompressError::config(
                    "Unsupported config file format. Use .toml or .yaml",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(quality) = self.processing.quality {
            if !(1..=100).contains(&quality) {
                return Err(CompressError::config(format!(
                    "processing.quality must be between 1 and 100, got {}",
                    quality
                )));
            }
        }

        if self.processing.threads == Some(0) {
            return Err(CompressError::config(
                "processing.threads must be greater than 0",
            ));
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(CompressError::config(
                "monitor.poll_interval_ms must be greater than 0",
            ));
        }

        if self.monitor.bar_width == 0 {
            return Err(CompressError::config(
                "monitor.bar_width must be greater than 0",
            ));
        }

        Ok(())
    }
}
