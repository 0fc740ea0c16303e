//! Shared configuration types consumed by the facescan crates.
//!
//! Settings are persisted as JSON. Every section is `#[serde(default)]` so partial files only
//! override what they mention.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

/// Detection parameters forwarded to the detector's postprocessing stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum confidence (objectness x class score) for a box to count as a face.
    pub conf_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed.
    pub iou_threshold: f32,
    /// The maximum number of detections kept per image.
    pub max_detections: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            iou_threshold: 0.4,
            max_detections: 1_000,
        }
    }
}

/// Model input resolution in pixels. Images are letterboxed to this size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
        }
    }
}

/// Traversal and output options for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    /// Subject directory names to process. `None` processes every subject.
    pub subjects: Option<Vec<String>>,
    /// Device subdirectories visited inside each subject directory, in order.
    pub device_dirs: Vec<String>,
    /// Accepted image extensions (compared case-insensitively, without the dot).
    pub extensions: Vec<String>,
    /// Prefix for cropped face files.
    pub crop_prefix: String,
    /// File name of the spreadsheet report written into the output directory.
    pub report_name: String,
    /// JPEG quality used when a crop is written as JPEG (1-100).
    pub jpeg_quality: u8,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            subjects: None,
            device_dirs: vec!["Camera".into(), "Mobile".into()],
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            crop_prefix: "crop_".into(),
            report_name: "face_detection_details_yolov5.xlsx".into(),
            jpeg_quality: 95,
        }
    }
}

impl RunSettings {
    /// Clamp values to sensible ranges.
    pub fn sanitize(&mut self) {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if let Some(subjects) = self.subjects.as_mut() {
            subjects.retain(|s| !s.trim().is_empty());
        }
        for ext in &mut self.extensions {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
    }

    /// Returns `true` when `subject` passes the optional allow-list.
    pub fn allows_subject(&self, subject: &str) -> bool {
        match &self.subjects {
            Some(list) => list.iter().any(|s| s == subject),
            None => true,
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings for a facescan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Path to the YOLOv5 face model exported to ONNX.
    pub model_path: Option<String>,
    pub input: InputDimensions,
    pub detection: DetectionSettings,
    pub run: RunSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some(DEFAULT_MODEL_PATH.into()),
            input: InputDimensions::default(),
            detection: DetectionSettings::default(),
            run: RunSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

/// Model location used when neither the settings file nor the CLI names one.
pub const DEFAULT_MODEL_PATH: &str = "models/yolov5_face.onnx";

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// A missing `model_path` falls back to [`DEFAULT_MODEL_PATH`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.model_path.is_none() {
            settings.model_path = Some(DEFAULT_MODEL_PATH.into());
        }
        settings.run.sanitize();

        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Returns the default path for persisted settings (`config/facescan_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/facescan_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/facescan_settings.json"))
}
