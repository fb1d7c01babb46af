//! Image format detection and output naming

use std::path::{Path, PathBuf};

use crate::config::{ImageFormat, ResizeRequest};
use crate::error::{CompressError, Result};

/// Extensions picked up when scanning a directory, matched exactly
pub const CATALOG_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Check if a file extension is picked up by a directory scan.
///
/// No case folding: `photo.JPG` is not part of the catalog.
pub fn is_catalog_extension(extension: &str) -> bool {
    CATALOG_EXTENSIONS.contains(&extension)
}

/// Detect the output encoder from a file extension (ASCII case-insensitive)
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ImageFormat> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        other => Err(CompressError::encode(
            path,
            format!("unsupported output format '{}', expected JPEG or PNG", other),
        )),
    }
}

/// Build `<output_dir>/<stem>_<size>_<quality>.<ext>` for a source image.
///
/// The extension is kept exactly as given, so distinct inputs never map
/// to the same output within one run.
pub fn output_path_for(source: &Path, output_dir: &Path, request: &ResizeRequest) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let mut name = format!(
        "{}_{}_{}",
        stem,
        request.mode.size_token(),
        request.quality
    );

    if let Some(ext) = source.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }

    output_dir.join(name)
}
