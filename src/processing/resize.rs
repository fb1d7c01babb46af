//! Target dimension calculation for the three resize policies

use tracing::trace;

use crate::config::{ResizeMode, ResizeRequest};
use crate::error::{CompressError, Result};

/// Output size of a single job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel layout used while resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Opaque three-channel layout
    Rgb,
    /// Alpha-aware four-channel layout
    Rgba,
}

impl PixelLayout {
    /// Pick a layout from the decoded channel count (2 = gray+alpha, 4 = RGBA)
    pub fn for_channels(channels: u8) -> Self {
        match channels {
            2 | 4 => Self::Rgba,
            _ => Self::Rgb,
        }
    }
}

/// Largest accepted side of a resized image
pub const MAX_DIMENSION: u32 = 32_768;

/// Largest accepted resized image, in pixels
pub const MAX_PIXELS: u64 = 100_000_000;

/// Compute target dimensions for one image, preserving aspect ratio.
///
/// Fails with [`CompressError::DegenerateDimension`] when the source has a
/// zero side or when a computed side rounds down to zero, and with
/// [`CompressError::ImageTooLarge`] when the target exceeds
/// [`MAX_DIMENSION`] or [`MAX_PIXELS`]. Both checks run before any pixel
/// buffer is allocated.
pub fn resolve(
    original_width: u32,
    original_height: u32,
    request: &ResizeRequest,
) -> Result<Dimensions> {
    if original_width == 0 || original_height == 0 {
        return Err(CompressError::degenerate(original_width, original_height));
    }

    let aspect_ratio = f64::from(original_width) / f64::from(original_height);

    let (width, height) = match request.mode {
        ResizeMode::Width { width } => (f64::from(width), (f64::from(width) / aspect_ratio).round()),
        ResizeMode::Height { height } => ((f64::from(height) * aspect_ratio).round(), f64::from(height)),
        ResizeMode::Percentage { percent } => {
            let scale = f64::from(percent) / 100.0;
            (
                (f64::from(original_width) * scale).round(),
                (f64::from(original_height) * scale).round(),
            )
        }
    };

    let limit = f64::from(MAX_DIMENSION);
    if width > limit || height > limit {
        return Err(CompressError::image_too_large(
            to_u64(width),
            to_u64(height),
            u64::from(MAX_DIMENSION),
        ));
    }

    // In range for u32 after the check above
    let (width, height) = (width as u32, height as u32);

    if width == 0 || height == 0 {
        return Err(CompressError::degenerate(width, height));
    }

    let target = Dimensions { width, height };
    if target.pixel_count() > MAX_PIXELS {
        return Err(CompressError::image_too_large(
            u64::from(width),
            u64::from(height),
            MAX_PIXELS,
        ));
    }

    trace!(
        "Resolved {}x{} -> {} ({:?})",
        original_width,
        original_height,
        target,
        request.mode
    );

    Ok(target)
}

// Saturating: values beyond u64 clamp instead of wrapping
fn to_u64(value: f64) -> u64 {
    value as u64
}
