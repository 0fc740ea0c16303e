//! Core face-detection primitives for labeled biometric capture sets.
//!
//! This crate parses capture metadata from file names, runs a YOLOv5 face model through
//! `tract-onnx`, crops the best detection and accumulates the per-image report.

/// Face crop geometry and persistence.
pub mod cropper;
/// High-level face detection runner.
pub mod detector;
/// File-name metadata parsing.
pub mod metadata;
/// ONNX model loading and execution.
pub mod model;
/// Per-image processing and batch loop.
pub mod pipeline;
/// Detection post-processing (confidence filtering, NMS).
pub mod postprocess;
/// Image pre-processing (letterbox, tensor conversion).
pub mod preprocess;
/// Report rows and spreadsheet export.
pub mod report;

pub use cropper::{CropRegion, CropTarget, PixelBox, crop_and_save, crop_region};
pub use detector::{FaceDetector, YoloDetector};
pub use metadata::{Category, Device, Environment, ImageMetadata, MetadataError, parse_filename};
pub use model::YoloModel;
pub use pipeline::{ImageOutcome, PipelineOptions, SkipReason, process_image, run_batch};
pub use postprocess::{Detection, PostprocessConfig, apply_postprocess, best_detection};
pub use preprocess::{InputSize, Letterbox, PreprocessConfig, PreprocessOutput, preprocess_image};
pub use report::{DetectionOutcome, DetectionStatus, ImageRecord, Report, ReportSummary};

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
