//! Error types and handling for imgcompress

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for imgcompress operations
pub type Result<T> = std::result::Result<T, CompressError>;

/// Main error type for imgcompress operations
#[derive(Debug, Error)]
pub enum CompressError {
    /// I/O related errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Bad, missing or conflicting run parameters
    #[error("Invalid arguments: {message}")]
    ValidationError { message: String },

    /// Input directory is missing or not a directory
    #[error("Image directory does not exist: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// Configuration file errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// Worker pool could not be started
    #[error("Parallel processing error: {message}")]
    ParallelError { message: String },

    /// Source image could not be read or decoded
    #[error("Failed to decode {}: {message}", file.display())]
    DecodeError { file: PathBuf, message: String },

    /// Resampling failed or produced nothing
    #[error("Failed to resize {}: {message}", file.display())]
    ResizeError { file: PathBuf, message: String },

    /// Output could not be encoded or written
    #[error("Failed to encode {}: {message}", file.display())]
    EncodeError { file: PathBuf, message: String },

    /// Target exceeds the per-side or total pixel limit
    #[error("Image too large: {width}x{height} (limit: {limit}, file: {file:?})")]
    ImageTooLarge {
        width: u64,
        height: u64,
        limit: u64,
        file: Option<PathBuf>,
    },

    /// The codec panicked while handling one file
    #[error("Codec panicked on {}: {message}", file.display())]
    CodecPanic { file: PathBuf, message: String },

    /// Zero-height source or a target that rounds to zero pixels
    #[error("Degenerate dimensions {width}x{height} (file: {file:?})")]
    DegenerateDimension {
        width: u32,
        height: u32,
        file: Option<PathBuf>,
    },
}

impl CompressError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Create a new missing directory error
    pub fn directory_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::ParallelError {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(file: &Path, message: S) -> Self {
        Self::DecodeError {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a new resize error
    pub fn resize<S: Into<String>>(file: &Path, message: S) -> Self {
        Self::ResizeError {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(file: &Path, message: S) -> Self {
        Self::EncodeError {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a new degenerate dimension error
    pub fn degenerate(width: u32, height: u32) -> Self {
        Self::DegenerateDimension {
            width,
            height,
            file: None,
        }
    }

    /// Create a new image too large error
    pub fn image_too_large(width: u64, height: u64, limit: u64) -> Self {
        Self::ImageTooLarge {
            width,
            height,
            limit,
            file: None,
        }
    }

    /// Create a new codec panic error
    pub fn codec_panic<S: Into<String>>(file: &Path, message: S) -> Self {
        Self::CodecPanic {
            file: file.to_path_buf(),
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the batch can continue)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Per-file failures: the job is skipped, siblings keep running
            Self::DecodeError { .. }
            | Self::ResizeError { .. }
            | Self::EncodeError { .. }
            | Self::ImageTooLarge { .. }
            | Self::CodecPanic { .. }
            | Self::DegenerateDimension { .. } => true,

            // Everything else aborts the run before workers start
            Self::IoError(_)
            | Self::ValidationError { .. }
            | Self::DirectoryNotFound { .. }
            | Self::ConfigError { .. }
            | Self::SerdeError(_)
            | Self::ParallelError { .. } => false,
        }
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::DecodeError { file, .. }
            | Self::ResizeError { file, .. }
            | Self::EncodeError { file, .. }
            | Self::CodecPanic { file, .. } => Some(file.as_path()),
            Self::DirectoryNotFound { path } => Some(path.as_path()),
            Self::DegenerateDimension { file, .. } | Self::ImageTooLarge { file, .. } => {
                file.as_deref()
            }
            _ => None,
        }
    }

    /// Attach a source path to a dimension error
    pub fn for_file(mut self, path: &Path) -> Self {
        if let Self::DegenerateDimension { file, .. } | Self::ImageTooLarge { file, .. } = &mut self {
            if file.is_none() {
                *file = Some(path.to_path_buf());
            }
        }
        self
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError { message } => {
                format!("{message}. Run with --help for usage information")
            }
            Self::DirectoryNotFound { path } => {
                format!("Specified image directory does not exist: {}", path.display())
            }
            Self::DegenerateDimension { width, height, .. } => format!(
                "Image would be resized to {width}x{height} pixels. Use a larger size factor, width or height"
            ),
            Self::ImageTooLarge { width, height, limit, .. } => format!(
                "Image would be resized to {width}x{height} pixels, over the limit of {limit}"
            ),
            other => other.to_string(),
        }
    }
}

// Convert serde errors to our error type
impl From<toml::de::Error> for CompressError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for CompressError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}
