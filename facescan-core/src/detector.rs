use std::path::Path;

use anyhow::Result;
use image::DynamicImage;

use crate::model::YoloModel;
use crate::postprocess::{Detection, PostprocessConfig, apply_postprocess};
use crate::preprocess::{PreprocessConfig, preprocess_image};
use facescan_utils::timing_guard;

/// Anything that can locate faces in a decoded image.
///
/// The batch pipeline only talks to this trait, so alternative backends (or test doubles)
/// can stand in for the ONNX detector.
pub trait FaceDetector {
    /// Return every face above the confidence threshold, in source-image coordinates,
    /// sorted by descending confidence.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// YOLOv5 face detector: letterbox preprocessing, tract inference and YOLO postprocessing.
#[derive(Debug)]
pub struct YoloDetector {
    model: YoloModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
}

impl YoloDetector {
    /// Construct a detector from a model path and configuration.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
    ) -> Result<Self> {
        let model = YoloModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
        })
    }
}

impl FaceDetector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let _guard = timing_guard("facescan_core::detect", log::Level::Debug);
        let prep = preprocess_image(image, &self.preprocess)?;

        let raw = {
            let _guard = timing_guard("facescan_core::onnx_inference", log::Level::Debug);
            self.model.run(prep.tensor)?
        };

        apply_postprocess(&raw, &prep.letterbox, &self.postprocess)
    }
}
