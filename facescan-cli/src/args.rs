//! Command-line argument definitions for facescan.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Detect and crop faces across a `Subject/{Camera,Mobile}` capture tree and write a
/// per-image spreadsheet report.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct RunArgs {
    /// Dataset root containing one directory per subject.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory receiving face crops and the report.
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Path to the YOLOv5 face model (ONNX). Defaults to the settings file value.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Optional settings JSON. Defaults to `config/facescan_settings.json` when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Only process these subject directories (may be repeated).
    #[arg(long = "subject", value_name = "SUBJECT_ID")]
    pub subjects: Vec<String>,

    /// Override the confidence threshold.
    #[arg(long)]
    pub conf_threshold: Option<f32>,

    /// Override the NMS IoU threshold.
    #[arg(long)]
    pub iou_threshold: Option<f32>,

    /// Override model input width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Override model input height (pixels).
    #[arg(long)]
    pub height: Option<u32>,

    /// Report file name inside the output directory.
    #[arg(long)]
    pub report_name: Option<String>,

    /// Also write the report as CSV to this path.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Enable telemetry timing logs.
    #[arg(long, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        RunArgs::command().debug_assert();
    }

    #[test]
    fn parses_repeated_subjects() {
        let args = RunArgs::try_parse_from([
            "facescan",
            "--input",
            "data",
            "--subject",
            "Subject_269",
            "--subject",
            "Subject_270",
            "--conf-threshold",
            "0.6",
        ])
        .unwrap();
        assert_eq!(args.subjects, ["Subject_269", "Subject_270"]);
        assert_eq!(args.conf_threshold, Some(0.6));
        assert_eq!(args.output_dir, PathBuf::from("output"));
        assert!(args.model.is_none());
    }

    #[test]
    fn input_is_required() {
        assert!(RunArgs::try_parse_from(["facescan"]).is_err());
    }
}
