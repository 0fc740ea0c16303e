//! Per-image report rows and their spreadsheet/CSV export.
//!
//! Rows are accumulated in memory in processing order and written once, at the end of a run.

use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use log::info;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

use crate::cropper::PixelBox;
use crate::metadata::{Category, Device, Environment, ImageMetadata};
use facescan_utils::format_dimensions;

/// Report column headers, in output order.
pub const COLUMNS: [&str; 11] = [
    "subject number",
    "image name",
    "indoor/outdoor",
    "device",
    "distance",
    "category",
    "detection",
    "face box coordinate",
    "detection time (s)",
    "input image size",
    "cropped image size",
];

/// Sheet that holds the report rows.
pub const SHEET_NAME: &str = "Detections";

/// Box column value when nothing was cropped.
pub const NO_FACE: &str = "No face detected";
/// Cropped-size column value when nothing was cropped.
pub const NOT_APPLICABLE: &str = "N/A";
/// Detection time recorded when inference failed.
pub const FAILED_DETECTION_TIME: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    Detected,
    NoDetection,
}

impl DetectionStatus {
    pub fn as_label(self) -> &'static str {
        match self {
            DetectionStatus::Detected => "Detected",
            DetectionStatus::NoDetection => "No Detection",
        }
    }
}

impl fmt::Display for DetectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Outcome of the detect-and-crop step for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectionOutcome {
    /// A face was found and its crop written.
    Cropped { face: PixelBox },
    /// Inference succeeded but produced no usable crop.
    NoFace,
    /// Inference failed.
    Failed,
}

/// One report row. Built once per processed file and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub subject_number: String,
    pub image_name: String,
    pub environment: Environment,
    pub device: Device,
    pub distance: String,
    pub category: Category,
    pub outcome: DetectionOutcome,
    /// Seconds, rounded to two decimals; [`FAILED_DETECTION_TIME`] when inference failed.
    pub detection_time: f64,
    pub input_size: (u32, u32),
}

impl ImageRecord {
    pub fn new(
        image_name: impl Into<String>,
        metadata: &ImageMetadata,
        input_size: (u32, u32),
        outcome: DetectionOutcome,
        detection_time: f64,
    ) -> Self {
        Self {
            subject_number: metadata.subject_number.clone(),
            image_name: image_name.into(),
            environment: metadata.environment,
            device: metadata.device,
            distance: metadata.distance.clone(),
            category: metadata.category,
            outcome,
            detection_time: match outcome {
                DetectionOutcome::Failed => FAILED_DETECTION_TIME,
                _ => detection_time,
            },
            input_size,
        }
    }

    pub fn status(&self) -> DetectionStatus {
        match self.outcome {
            DetectionOutcome::Cropped { .. } => DetectionStatus::Detected,
            DetectionOutcome::NoFace | DetectionOutcome::Failed => DetectionStatus::NoDetection,
        }
    }

    pub fn face_box_label(&self) -> String {
        match self.outcome {
            DetectionOutcome::Cropped { face } => face.coordinates(),
            _ => NO_FACE.to_string(),
        }
    }

    pub fn cropped_size_label(&self) -> String {
        match self.outcome {
            DetectionOutcome::Cropped { face } => face.size_label(),
            _ => NOT_APPLICABLE.to_string(),
        }
    }

    fn row(&self) -> ReportRow<'_> {
        ReportRow {
            subject_number: &self.subject_number,
            image_name: &self.image_name,
            indoor_outdoor: self.environment.as_label(),
            device: self.device.as_label(),
            distance: &self.distance,
            category: self.category.as_label(),
            detection: self.status().as_label(),
            face_box: self.face_box_label(),
            detection_time: self.detection_time,
            input_size: format_dimensions(self.input_size.0, self.input_size.1),
            cropped_size: self.cropped_size_label(),
        }
    }
}

/// Round seconds to two decimals.
pub fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "subject number")]
    subject_number: &'a str,
    #[serde(rename = "image name")]
    image_name: &'a str,
    #[serde(rename = "indoor/outdoor")]
    indoor_outdoor: &'static str,
    device: &'static str,
    distance: &'a str,
    category: &'static str,
    detection: &'static str,
    #[serde(rename = "face box coordinate")]
    face_box: String,
    #[serde(rename = "detection time (s)")]
    detection_time: f64,
    #[serde(rename = "input image size")]
    input_size: String,
    #[serde(rename = "cropped image size")]
    cropped_size: String,
}

/// Aggregate counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub detected: usize,
    pub not_detected: usize,
    pub failed: usize,
}

/// Ordered, append-only collection of report rows.
#[derive(Debug, Default)]
pub struct Report {
    records: Vec<ImageRecord>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImageRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.outcome {
                DetectionOutcome::Cropped { .. } => summary.detected += 1,
                DetectionOutcome::NoFace => summary.not_detected += 1,
                DetectionOutcome::Failed => {
                    summary.not_detected += 1;
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Write all rows to an `.xlsx` workbook with a bold header row.
    pub fn write_xlsx(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;

        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, title) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
        }

        for (idx, record) in self.records.iter().enumerate() {
            let row = idx as u32 + 1;
            let cells = record.row();
            let text = [
                (0, cells.subject_number),
                (1, cells.image_name),
                (2, cells.indoor_outdoor),
                (3, cells.device),
                (4, cells.distance),
                (5, cells.category),
                (6, cells.detection),
                (7, cells.face_box.as_str()),
                (9, cells.input_size.as_str()),
                (10, cells.cropped_size.as_str()),
            ];
            for (col, value) in text {
                sheet.write_string(row, col, value)?;
            }
            sheet.write_number(row, 8, cells.detection_time)?;
        }

        workbook
            .save(path)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        info!("Wrote {} row(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Write all rows as CSV with the same columns as the workbook.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        if self.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for record in &self.records {
            writer
                .serialize(record.row())
                .with_context(|| format!("failed to write CSV row for {}", record.image_name))?;
        }
        writer
            .flush()
            .with_context(|| format!("failed to flush {}", path.display()))?;
        info!("Wrote {} row(s) to {}", self.len(), path.display());
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}
