//! Helpers for writing cropped images to disk.
//!
//! The encoder is picked from the destination extension so crops keep the source format.

use anyhow::{Context, Result};
use image::{
    DynamicImage, ExtendedColorType, ImageEncoder,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};
use log::debug;
use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};

/// Image formats a crop can be written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormatHint {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormatHint {
    /// Determine format from a filesystem extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        ext.parse().ok()
    }

    /// Determine format from a destination path, defaulting to PNG.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .unwrap_or_default()
    }
}

impl std::str::FromStr for ImageFormatHint {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

/// Save a crop to `destination`, encoding by extension.
///
/// JPEG output drops any alpha channel and uses `jpeg_quality` (clamped to 1-100).
pub fn save_crop(image: &DynamicImage, destination: &Path, jpeg_quality: u8) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let format = ImageFormatHint::from_path(destination);
    debug!(
        "Saving crop to {} using {:?} format",
        destination.display(),
        format
    );

    let file = File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let writer = BufWriter::new(file);

    match format {
        ImageFormatHint::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(writer, jpeg_quality.clamp(1, 100))
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )
                .with_context(|| format!("failed to encode JPEG {}", destination.display()))?;
        }
        ImageFormatHint::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new(writer)
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .with_context(|| format!("failed to encode PNG {}", destination.display()))?;
        }
    }

    Ok(())
}
