//! Cropping the selected face and writing it next to the report.
//!
//! Box corners are truncated to integers and applied with slice semantics: negative indices
//! count from the far edge, out-of-range indices clamp to the image, and an inverted or empty
//! range yields no crop.

use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{DynamicImage, GenericImageView};
use log::warn;

use crate::postprocess::Detection;
use facescan_utils::{format_dimensions, save_crop};

/// Integer face box as written to the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl PixelBox {
    /// Truncate detection corners toward zero.
    pub fn from_detection(detection: &Detection) -> Self {
        Self {
            x1: detection.x1 as i64,
            y1: detection.y1 as i64,
            x2: detection.x2 as i64,
            y2: detection.y2 as i64,
        }
    }

    /// `x1,y1,x2,y2`
    pub fn coordinates(&self) -> String {
        format!("{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }

    /// Nominal `WxH` of the box, independent of image bounds.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.x2 - self.x1, self.y2 - self.y1)
    }
}

/// In-bounds pixel rectangle to copy out of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn size_label(&self) -> String {
        format_dimensions(self.width, self.height)
    }
}

/// Resolve a slice bound against an axis of length `len`.
fn slice_index(index: i64, len: u32) -> u32 {
    let len = i64::from(len);
    let resolved = if index < 0 { index + len } else { index };
    resolved.clamp(0, len) as u32
}

/// Compute the region `image[y1:y2, x1:x2]` would select, or `None` when it is empty.
pub fn crop_region(pixel_box: &PixelBox, width: u32, height: u32) -> Option<CropRegion> {
    let (x_start, x_stop) = (
        slice_index(pixel_box.x1, width),
        slice_index(pixel_box.x2, width),
    );
    let (y_start, y_stop) = (
        slice_index(pixel_box.y1, height),
        slice_index(pixel_box.y2, height),
    );
    if x_stop <= x_start || y_stop <= y_start {
        return None;
    }
    Some(CropRegion {
        x: x_start,
        y: y_start,
        width: x_stop - x_start,
        height: y_stop - y_start,
    })
}

/// Copy `region` out of `image`.
pub fn crop_image(image: &DynamicImage, region: &CropRegion) -> DynamicImage {
    image.crop_imm(region.x, region.y, region.width, region.height)
}

/// `<prefix><subject>_<original file name>`
pub fn crop_file_name(prefix: &str, subject_number: &str, original: &str) -> String {
    format!("{prefix}{subject_number}_{original}")
}

/// Where a crop should be written and how.
#[derive(Debug, Clone)]
pub struct CropTarget<'a> {
    pub output_dir: &'a Path,
    pub prefix: &'a str,
    pub subject_number: &'a str,
    pub original_name: &'a str,
    pub jpeg_quality: u8,
}

impl CropTarget<'_> {
    pub fn destination(&self) -> PathBuf {
        self.output_dir.join(crop_file_name(
            self.prefix,
            self.subject_number,
            self.original_name,
        ))
    }
}

/// Crop the selected box and write it to disk.
///
/// Returns `Ok(None)` (and logs a warning) when the box selects no pixels; no file is
/// written in that case.
pub fn crop_and_save(
    image: &DynamicImage,
    pixel_box: &PixelBox,
    target: &CropTarget<'_>,
) -> Result<Option<(PathBuf, CropRegion)>> {
    let (width, height) = image.dimensions();
    let Some(region) = crop_region(pixel_box, width, height) else {
        warn!(
            "Invalid crop area {} for {}",
            pixel_box.coordinates(),
            target.original_name
        );
        return Ok(None);
    };

    let cropped = crop_image(image, &region);
    let destination = target.destination();
    save_crop(&cropped, &destination, target.jpeg_quality)?;
    Ok(Some((destination, region)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn pbox(x1: i64, y1: i64, x2: i64, y2: i64) -> PixelBox {
        PixelBox { x1, y1, x2, y2 }
    }

    #[test]
    fn truncates_toward_zero() {
        let det = Detection {
            x1: 10.9,
            y1: 20.2,
            x2: 110.99,
            y2: 220.5,
            confidence: 0.9,
            class_id: 0,
        };
        let b = PixelBox::from_detection(&det);
        assert_eq!(b, pbox(10, 20, 110, 220));
        assert_eq!(b.coordinates(), "10,20,110,220");
        assert_eq!(b.size_label(), "100x200");
    }

    #[test]
    fn region_inside_image_matches_box() {
        let region = crop_region(&pbox(10, 20, 60, 100), 200, 200).unwrap();
        assert_eq!(
            region,
            CropRegion {
                x: 10,
                y: 20,
                width: 50,
                height: 80
            }
        );
    }

    #[test]
    fn region_follows_slice_semantics() {
        // stop past the edge clamps
        let region = crop_region(&pbox(150, 0, 400, 50), 200, 100).unwrap();
        assert_eq!((region.x, region.width), (150, 50));

        // negative start counts from the end
        let region = crop_region(&pbox(-20, 0, 200, 10), 200, 100).unwrap();
        assert_eq!((region.x, region.width), (180, 20));

        // inverted and zero-width ranges are empty
        assert!(crop_region(&pbox(50, 0, 50, 10), 200, 100).is_none());
        assert!(crop_region(&pbox(60, 0, 50, 10), 200, 100).is_none());
    }

    #[test]
    fn crop_and_save_writes_named_file() {
        let dir = tempdir().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 80, Rgb([1, 2, 3])));
        let target = CropTarget {
            output_dir: dir.path(),
            prefix: "crop_",
            subject_number: "42",
            original_name: "Subject_42_in_c_1m_live.png",
            jpeg_quality: 95,
        };

        let (path, region) = crop_and_save(&img, &pbox(10, 10, 40, 30), &target)
            .unwrap()
            .expect("crop written");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "crop_42_Subject_42_in_c_1m_live.png"
        );
        assert_eq!(region.size_label(), "30x20");
        let saved = image::open(&path).unwrap();
        assert_eq!(saved.dimensions(), (30, 20));
    }

    #[test]
    fn degenerate_box_writes_nothing() {
        let dir = tempdir().unwrap();
        let img = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let target = CropTarget {
            output_dir: dir.path(),
            prefix: "crop_",
            subject_number: "1",
            original_name: "S1_in_c_1m.png",
            jpeg_quality: 95,
        };

        let written = crop_and_save(&img, &pbox(20, 20, 20, 40), &target).unwrap();
        assert!(written.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
