//! Run parameters and their validation

use std::path::PathBuf;

use crate::config::ResizeMode;
use crate::error::{CompressError, Result};

/// Neutral size factor; any other value makes percentage mode "active"
pub const DEFAULT_SIZE_FACTOR: i64 = 100;

/// Default encode quality
pub const DEFAULT_QUALITY: u8 = 100;

/// Resize policy plus encode quality, shared read-only by every worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRequest {
    pub mode: ResizeMode,
    pub quality: u8,
}

impl ResizeRequest {
    /// Create a request that keeps original dimensions at full quality
    pub fn new() -> Self {
        Self {
            mode: ResizeMode::default(),
            quality: DEFAULT_QUALITY,
        }
    }

    /// Scale by percentage
    pub fn percentage(mut self, percent: u32) -> Self {
        self.mode = ResizeMode::Percentage { percent };
        self
    }

    /// Set target width
    pub fn width(mut self, width: u32) -> Self {
        self.mode = ResizeMode::Width { width };
        self
    }

    /// Set target height
    pub fn height(mut self, height: u32) -> Self {
        self.mode = ResizeMode::Height { height };
        self
    }

    /// Set quality
    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }
}

impl Default for ResizeRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw, unvalidated run parameters as collected from flags and config.
///
/// Numeric fields are signed so that negative input reaches validation
/// and is rejected with a domain message instead of a parser error.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub quality: i64,
    pub size_factor: i64,
    pub width: i64,
    pub height: i64,
    pub image_name: Option<String>,
    pub threads: Option<i64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            quality: i64::from(DEFAULT_QUALITY),
            size_factor: DEFAULT_SIZE_FACTOR,
            width: 0,
            height: 0,
            image_name: None,
            threads: None,
        }
    }
}

/// Validated parameters; constructing one is the only way to start a run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub request: ResizeRequest,
    pub image_name: Option<String>,
    pub threads: Option<usize>,
}

impl RunOptions {
    /// Check every parameter and decide the resize mode for the whole run.
    ///
    /// Nothing on disk is touched apart from checking that the input
    /// directory exists.
    pub fn validate(&self) -> Result<RunPlan> {
        let input_dir = non_empty(&self.input_dir);
        let output_dir = non_empty(&self.output_dir);
        let (Some(input_dir), Some(output_dir)) = (input_dir, output_dir) else {
            return Err(CompressError::validation(
                "--imgdir and --outdir are required parameters",
            ));
        };

        if !input_dir.is_dir() {
            return Err(CompressError::directory_not_found(input_dir));
        }

        if self.size_factor <= 0 {
            return Err(CompressError::validation(
                "--size-factor must be a positive integer",
            ));
        }

        if !(1..=100).contains(&self.quality) {
            return Err(CompressError::validation(
                "--quality must be between 1 and 100",
            ));
        }

        if self.width < 0 {
            return Err(CompressError::validation(
                "--width must be a non-negative integer",
            ));
        }

        if self.height < 0 {
            return Err(CompressError::validation(
                "--height must be a non-negative integer",
            ));
        }

        let active = [
            self.size_factor != DEFAULT_SIZE_FACTOR,
            self.width != 0,
            self.height != 0,
        ]
        .into_iter()
        .filter(|active| *active)
        .count();

        if active > 1 {
            return Err(CompressError::validation(
                "Only one of --size-factor, --width, or --height should be specified",
            ));
        }

        let threads = match self.threads {
            Some(threads) if threads < 1 => {
                return Err(CompressError::validation(
                    "--threads must be a positive integer",
                ))
            }
            Some(threads) => Some(to_usize(threads, "--threads")?),
            None => None,
        };

        let mode = if self.width != 0 {
            ResizeMode::Width {
                width: to_u32(self.width, "--width")?,
            }
        } else if self.height != 0 {
            ResizeMode::Height {
                height: to_u32(self.height, "--height")?,
            }
        } else {
            ResizeMode::Percentage {
                percent: to_u32(self.size_factor, "--size-factor")?,
            }
        };

        let image_name = self
            .image_name
            .as_ref()
            .filter(|name| !name.is_empty())
            .cloned();

        Ok(RunPlan {
            input_dir,
            output_dir,
            request: ResizeRequest {
                mode,
                // Range-checked above
                quality: self.quality as u8,
            },
            image_name,
            threads,
        })
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.as_ref()
        .filter(|p| !p.as_os_str().is_empty())
        .cloned()
}

fn to_u32(value: i64, flag: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CompressError::validation(format!("{flag} is too large: {value}")))
}

fn to_usize(value: i64, flag: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| CompressError::validation(format!("{flag} is too large: {value}")))
}
