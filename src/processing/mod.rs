//! Per-image processing: decode, resolve target size, resample, encode

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ResizeRequest;
use crate::error::Result;

pub mod codec;
pub mod formats;
pub mod resize;

pub use codec::*;
pub use formats::*;
pub use resize::*;

/// Result of one successfully processed image
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub output_path: PathBuf,
    pub original: Dimensions,
    pub resized: Dimensions,
    pub processing_time: Duration,
}

/// Run the full decode/resize/encode pipeline for a single source image.
///
/// Any failure is scoped to this file; the caller decides how to report it.
pub fn process_job<C>(
    source: &Path,
    output_dir: &Path,
    request: &ResizeRequest,
    codec: &C,
) -> Result<JobOutcome>
where
    C: ImageCodec + ?Sized,
{
    let start_time = Instant::now();

    let output_path = output_path_for(source, output_dir, request);
    let format = detect_format_from_path(&output_path)?;

    let image = codec.decode(source)?;
    let original = Dimensions::new(image.width(), image.height());

    let target = resolve(original.width, original.height, request).map_err(|e| e.for_file(source))?;
    let layout = PixelLayout::for_channels(image.color().channel_count());

    debug!(
        "Resizing {:?}: {} -> {} ({:?})",
        source, original, target, layout
    );

    let resized = codec.resize(source, &image, target, layout)?;
    drop(image);

    codec.encode(&resized, format, request.quality, &output_path)?;

    Ok(JobOutcome {
        output_path,
        original,
        resized: target,
        processing_time: start_time.elapsed(),
    })
}
