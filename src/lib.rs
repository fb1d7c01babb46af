//! imgcompress - parallel batch image resizer
//!
//! Resizes and re-encodes every JPEG and PNG in a directory on a fixed-size
//! pool of worker threads. Workers claim images from a shared lock-free
//! cursor, a separate thread renders progress, and a failing image is logged
//! and skipped without affecting the rest of the batch.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use imgcompress::{ImageCrateCodec, RunCoordinator, RunOptions};
//!
//! let options = RunOptions {
//!     input_dir: Some("photos".into()),
//!     output_dir: Some("photos/small".into()),
//!     size_factor: 50,
//!     quality: 80,
//!     ..Default::default()
//! };
//!
//! let result = RunCoordinator::new(ImageCrateCodec::new()).run(&options)?;
//! println!("{} of {} images resized", result.processed, result.total_found);
//! # Ok::<(), imgcompress::CompressError>(())
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod parallel;
pub mod processing;

// Re-export commonly used types
pub use catalog::{Catalog, Job};
pub use config::{Config, ImageFormat, LoggingConfig, ResizeMode, ResizeRequest, RunOptions};
pub use coordinator::{RunCoordinator, RunResult};
pub use error::{CompressError, Result};
pub use processing::{Dimensions, ImageCodec, ImageCrateCodec};

use tracing_subscriber::EnvFilter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `config.level`. Returns `false` when a
/// subscriber was already installed, which is not an error.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json_format {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!("imgcompress v{} logging initialized", VERSION);
    }
    installed
}
