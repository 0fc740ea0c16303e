//! Preprocessing utilities for preparing images for YOLOv5 inference.
//!
//! Images are letterboxed: resized with their aspect ratio preserved, then padded with a
//! constant gray border up to the model input size. The output carries the scale and padding
//! needed to map boxes back onto the source image.

use anyhow::Result;
use facescan_utils::{config::InputDimensions, timing_guard};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, imageops, imageops::FilterType};
use tract_onnx::prelude::{Tensor, tract_ndarray::Array4};

/// Padding value used by YOLOv5's letterbox.
pub const LETTERBOX_FILL: u8 = 114;

/// Desired input resolution for the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(640, 640)
    }
}

/// Configuration for preprocessing an image before inference.
#[derive(Debug, Clone, Default)]
pub struct PreprocessConfig {
    pub input_size: InputSize,
}

impl From<InputDimensions> for PreprocessConfig {
    fn from(dimensions: InputDimensions) -> Self {
        PreprocessConfig {
            input_size: InputSize::new(dimensions.width, dimensions.height),
        }
    }
}

/// Geometry of a letterbox transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Uniform resize factor applied to the source image.
    pub scale: f32,
    /// Horizontal padding (left side) in model pixels.
    pub pad_x: f32,
    /// Vertical padding (top side) in model pixels.
    pub pad_y: f32,
    /// Source image dimensions.
    pub original_size: (u32, u32),
}

impl Letterbox {
    /// Compute the letterbox that fits `original` into `target`.
    pub fn fit(original: (u32, u32), target: InputSize) -> Result<Self> {
        let (orig_w, orig_h) = original;
        anyhow::ensure!(
            orig_w > 0 && orig_h > 0,
            "original dimensions must be non-zero"
        );
        anyhow::ensure!(
            target.width > 0 && target.height > 0,
            "input dimensions must be greater than zero"
        );

        let scale =
            (target.width as f32 / orig_w as f32).min(target.height as f32 / orig_h as f32);
        let (new_w, new_h) = scaled_size(original, scale);
        Ok(Self {
            scale,
            pad_x: (target.width.saturating_sub(new_w) / 2) as f32,
            pad_y: (target.height.saturating_sub(new_h) / 2) as f32,
            original_size: original,
        })
    }

    /// Resized content dimensions inside the padded canvas.
    pub fn content_size(&self) -> (u32, u32) {
        scaled_size(self.original_size, self.scale)
    }

    /// Map an x/y pair from model space back to source-image space.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

fn scaled_size((w, h): (u32, u32), scale: f32) -> (u32, u32) {
    (
        ((w as f32 * scale).round() as u32).max(1),
        ((h as f32 * scale).round() as u32).max(1),
    )
}

/// Output of preprocessing: tensor plus the letterbox used to produce it.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// `[1, 3, H, W]` RGB tensor with values in `[0, 1]`.
    pub tensor: Tensor,
    pub letterbox: Letterbox,
}

/// Letterbox an in-memory image into a YOLOv5-ready tensor.
pub fn preprocess_image(
    image: &DynamicImage,
    config: &PreprocessConfig,
) -> Result<PreprocessOutput> {
    let _guard = timing_guard("facescan_core::preprocess_image", log::Level::Trace);
    let target = config.input_size;
    let letterbox = Letterbox::fit(image.dimensions(), target)?;
    let canvas = letterbox_canvas(image, &letterbox, target);

    let (width, height) = (target.width as usize, target.height as usize);
    let mut array = Array4::<f32>::zeros((1, 3, height, width));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let (xi, yi) = (x as usize, y as usize);
        array[(0, 0, yi, xi)] = pixel[0] as f32 / 255.0;
        array[(0, 1, yi, xi)] = pixel[1] as f32 / 255.0;
        array[(0, 2, yi, xi)] = pixel[2] as f32 / 255.0;
    }

    Ok(PreprocessOutput {
        tensor: array.into(),
        letterbox,
    })
}

/// Resize and pad `image` onto a gray canvas of `target` size.
pub fn letterbox_canvas(
    image: &DynamicImage,
    letterbox: &Letterbox,
    target: InputSize,
) -> RgbImage {
    let (new_w, new_h) = letterbox.content_size();
    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();
    let mut canvas =
        RgbImage::from_pixel(target.width, target.height, Rgb([LETTERBOX_FILL; 3]));
    imageops::replace(
        &mut canvas,
        &resized,
        letterbox.pad_x as i64,
        letterbox.pad_y as i64,
    );
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::Ix4;

    #[test]
    fn letterbox_pads_the_short_side() {
        let lb = Letterbox::fit((1280, 720), InputSize::default()).unwrap();
        assert!((lb.scale - 0.5).abs() < f32::EPSILON);
        assert_eq!(lb.content_size(), (640, 360));
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);

        let (x, y) = lb.unmap(320.0, 320.0);
        assert!((x - 640.0).abs() < 1e-3);
        assert!((y - 360.0).abs() < 1e-3);
    }

    #[test]
    fn letterbox_rejects_empty_images() {
        assert!(Letterbox::fit((0, 10), InputSize::default()).is_err());
        assert!(Letterbox::fit((10, 10), InputSize::new(0, 640)).is_err());
    }

    #[test]
    fn tensor_has_expected_layout_and_padding() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([255, 0, 0])));
        let config = PreprocessConfig {
            input_size: InputSize::new(64, 64),
        };
        let out = preprocess_image(&img, &config).unwrap();
        assert_eq!(out.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(out.letterbox.pad_y, 16.0);

        let view = out
            .tensor
            .to_array_view::<f32>()
            .unwrap()
            .into_dimensionality::<Ix4>()
            .unwrap();
        // top padding row is gray
        assert!((view[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 1e-6);
        // content is red
        assert!((view[[0, 0, 32, 32]] - 1.0).abs() < 1e-6);
        assert!(view[[0, 1, 32, 32]].abs() < 1e-6);
    }
}
