use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;

/// Load an image from disk into memory.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    image::open(path_ref).with_context(|| format!("failed to open image {}", path_ref.display()))
}

/// Render dimensions as `WxH`.
pub fn format_dimensions(width: u32, height: u32) -> String {
    format!("{width}x{height}")
}

/// Returns `true` when `path` has one of `extensions` (case-insensitive, no leading dot).
pub fn has_image_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
