use anyhow::Result;
use facescan_utils::config::DetectionSettings;
use std::cmp::Ordering;
use tract_onnx::prelude::{Tensor, tract_ndarray::ArrayView2};

use crate::preprocess::Letterbox;

/// Columns preceding the per-class scores in a YOLOv5 prediction row (cx, cy, w, h, obj).
const BOX_COLS: usize = 5;

/// YOLOv5 detection configuration.
///
/// These parameters control how raw model outputs are filtered and refined.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Minimum confidence (objectness x class score) for a detection to be kept.
    pub conf_threshold: f32,
    /// IoU above which the lower-scoring of two same-class boxes is suppressed.
    pub iou_threshold: f32,
    /// The maximum number of detections to return after NMS.
    pub max_detections: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            iou_threshold: 0.4,
            max_detections: 1_000,
        }
    }
}

/// A detected face in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if intersection <= 0.0 {
            return 0.0;
        }

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Pick the highest-confidence detection. The first of equal maxima wins.
pub fn best_detection(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best, det| match best {
        Some(current) if current.confidence >= det.confidence => Some(current),
        _ => Some(det),
    })
}

/// Decode YOLOv5 outputs into filtered detections.
///
/// Rows are `[cx, cy, w, h, objectness, class scores...]` in letterboxed model space. The
/// steps are: objectness and confidence filtering, conversion to corner form, mapping back
/// through `letterbox` with clipping to the source image, class-aware NMS and truncation to
/// `max_detections`.
pub fn apply_postprocess(
    output: &Tensor,
    letterbox: &Letterbox,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    let rows = prediction_rows(output)?;
    let (img_w, img_h) = letterbox.original_size;
    let (max_x, max_y) = (img_w as f32, img_h as f32);

    let mut detections = Vec::new();
    for row in rows.rows() {
        let objectness = row[4];
        if !objectness.is_finite() || objectness < config.conf_threshold {
            continue;
        }

        let (class_id, class_score) = row
            .iter()
            .skip(BOX_COLS)
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .unwrap_or((0, 1.0));
        let confidence = objectness * class_score;
        if !confidence.is_finite() || confidence < config.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);
        detections.push(Detection {
            x1: x1.clamp(0.0, max_x),
            y1: y1.clamp(0.0, max_y),
            x2: x2.clamp(0.0, max_x),
            y2: y2.clamp(0.0, max_y),
            confidence,
            class_id,
        });
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    if config.iou_threshold > 0.0 && detections.len() > 1 {
        detections = non_max_suppression(detections, config.iou_threshold);
    }

    if config.max_detections > 0 && detections.len() > config.max_detections {
        detections.truncate(config.max_detections);
    }

    Ok(detections)
}

/// View the model output as `[N, 5 + classes]` rows.
fn prediction_rows(output: &Tensor) -> Result<ArrayView2<'_, f32>> {
    let (rows, cols) = match output.shape() {
        [rows, cols] => (*rows, *cols),
        [1, rows, cols] => (*rows, *cols),
        other => anyhow::bail!(
            "YOLOv5 output must have shape [N, C] or [1, N, C] (got {:?})",
            other
        ),
    };
    anyhow::ensure!(
        cols > BOX_COLS,
        "YOLOv5 output needs at least {} columns per prediction (got {})",
        BOX_COLS + 1,
        cols
    );

    let slice = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("YOLOv5 output is not f32: {e}"))?;

    ArrayView2::from_shape((rows, cols), slice)
        .map_err(|_| anyhow::anyhow!("YOLOv5 output data is not contiguous"))
}

/// Greedy NMS over confidence-sorted detections; boxes of different classes never suppress
/// each other.
fn non_max_suppression(detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == detection.class_id && detection.iou(k) > threshold);
        if !suppressed {
            kept.push(detection);
        }
    }
    kept
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        PostprocessConfig {
            conf_threshold: settings.conf_threshold,
            iou_threshold: settings.iou_threshold,
            max_detections: settings.max_detections,
        }
    }
}
