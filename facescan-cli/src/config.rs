//! Configuration loading and CLI override logic.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use facescan_utils::{
    config::{AppSettings, DEFAULT_MODEL_PATH, default_settings_path},
    normalize_path,
};
use log::info;

use crate::args::RunArgs;

/// Load settings from `--config`, the default settings file, or built-in defaults.
pub fn load_settings(config_path: Option<&Path>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply command-line arguments on top of loaded or default settings.
pub fn apply_cli_overrides(settings: &mut AppSettings, args: &RunArgs) {
    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.display().to_string());
    }

    if args.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = args.telemetry_level.as_ref() {
        let normalized = level.trim().to_ascii_lowercase();
        if !normalized.is_empty() {
            if normalized == "off" {
                settings.telemetry.enabled = false;
            }
            settings.telemetry.level = normalized;
        }
    }

    if let Some(width) = args.width {
        settings.input.width = width;
    }
    if let Some(height) = args.height {
        settings.input.height = height;
    }
    if let Some(conf) = args.conf_threshold {
        settings.detection.conf_threshold = conf;
    }
    if let Some(iou) = args.iou_threshold {
        settings.detection.iou_threshold = iou;
    }

    if !args.subjects.is_empty() {
        settings.run.subjects = Some(args.subjects.clone());
    }
    if let Some(name) = args.report_name.as_ref() {
        settings.run.report_name = name.clone();
    }

    settings.run.sanitize();
}

/// Resolve the model path from settings, falling back to the built-in default.
pub fn model_path(settings: &AppSettings) -> PathBuf {
    PathBuf::from(
        settings
            .model_path
            .as_deref()
            .unwrap_or(DEFAULT_MODEL_PATH),
    )
}
