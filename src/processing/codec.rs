//! Codec seam: decode, resample and encode
//!
//! The worker pool only talks to [`ImageCodec`]. The production
//! implementation, [`ImageCrateCodec`], is backed by the `image` crate;
//! tests substitute their own implementations to inject failures.
//!
//! | Operation | `image` crate |
//! |---|---|
//! | Decode | `io::Reader` with content-based format guessing |
//! | Resize | `imageops::resize` on an RGB or RGBA buffer |
//! | Encode JPEG | `codecs::jpeg::JpegEncoder::new_with_quality` |
//! | Encode PNG | `codecs::png::PngEncoder`, channel layout preserved |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder};
use tracing::debug;

use crate::config::ImageFormat;
use crate::error::{CompressError, Result};
use crate::processing::resize::{Dimensions, PixelLayout};

/// External image codec used by every worker.
///
/// Implementations must be `Sync`: one instance is shared by the whole pool.
pub trait ImageCodec: Sync {
    /// Read and decode a source image
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    /// Resample to exactly `target` using the given pixel layout
    fn resize(
        &self,
        source: &Path,
        image: &DynamicImage,
        target: Dimensions,
        layout: PixelLayout,
    ) -> Result<DynamicImage>;

    /// Encode and write to `output`; `quality` only applies to lossy formats
    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: u8,
        output: &Path,
    ) -> Result<()>;
}

/// Available resampling filters
#[derive(Debug, Clone, Copy, Default)]
pub enum FilterType {
    /// Nearest neighbor (fastest, lowest quality)
    Nearest,
    /// Triangle (linear interpolation)
    Triangle,
    /// Catmull-Rom cubic spline
    CatmullRom,
    /// Lanczos with radius 3
    #[default]
    Lanczos3,
}

impl From<FilterType> for image::imageops::FilterType {
    fn from(filter: FilterType) -> Self {
        match filter {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Triangle => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec {
    filter: FilterType,
}

impl ImageCrateCodec {
    /// Create a codec with the default Lanczos3 filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with a custom filter
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        let reader = image::io::Reader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| CompressError::decode(path, e.to_string()))?;

        let image = reader
            .decode()
            .map_err(|e| CompressError::decode(path, e.to_string()))?;

        debug!(
            "Decoded {:?}: {}x{} ({:?})",
            path,
            image.width(),
            image.height(),
            image.color()
        );

        Ok(image)
    }

    fn resize(
        &self,
        source: &Path,
        image: &DynamicImage,
        target: Dimensions,
        layout: PixelLayout,
    ) -> Result<DynamicImage> {
        let filter: image::imageops::FilterType = self.filter.into();

        let resized = match layout {
            PixelLayout::Rgba => DynamicImage::ImageRgba8(image::imageops::resize(
                &image.to_rgba8(),
                target.width,
                target.height,
                filter,
            )),
            PixelLayout::Rgb => DynamicImage::ImageRgb8(image::imageops::resize(
                &image.to_rgb8(),
                target.width,
                target.height,
                filter,
            )),
        };

        if resized.width() != target.width
            || resized.height() != target.height
            || resized.as_bytes().is_empty()
        {
            return Err(CompressError::resize(
                source,
                format!(
                    "resampler returned {}x{} instead of {}",
                    resized.width(),
                    resized.height(),
                    target
                ),
            ));
        }

        Ok(resized)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: ImageFormat,
        quality: u8,
        output: &Path,
    ) -> Result<()> {
        if !format.is_lossy() && quality < 100 {
            debug!("Quality {} ignored for lossless {:?} output {:?}", quality, format, output);
        }

        let file = File::create(output).map_err(|e| CompressError::encode(output, e.to_string()))?;
        let mut writer = BufWriter::new(file);

        let encoded = match format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = image.to_rgb8();
                JpegEncoder::new_with_quality(&mut writer, quality).encode(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ColorType::Rgb8,
                )
            }
            ImageFormat::Png => {
                let (bytes, color) = if image.color().has_alpha() {
                    (image.to_rgba8().into_raw(), ColorType::Rgba8)
                } else {
                    (image.to_rgb8().into_raw(), ColorType::Rgb8)
                };
                PngEncoder::new(&mut writer).write_image(
                    &bytes,
                    image.width(),
                    image.height(),
                    color,
                )
            }
        };

        encoded.map_err(|e| CompressError::encode(output, e.to_string()))?;
        writer
            .flush()
            .map_err(|e| CompressError::encode(output, e.to_string()))?;

        Ok(())
    }
}
