//! End-to-end run: settings, model, traversal, per-image pipeline, report export.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use facescan_core::{
    FaceDetector, PipelineOptions, PostprocessConfig, PreprocessConfig, Report, ReportSummary,
    YoloDetector, run_batch,
};
use facescan_utils::{AppSettings, configure_telemetry, normalize_path, timing_guard_if};
use log::{info, warn};

use crate::{
    args::RunArgs,
    config::{apply_cli_overrides, load_settings, model_path},
    input::collect_subject_images,
};

/// Resolved inputs for a batch, before any model is loaded.
#[derive(Debug)]
pub struct BatchPlan {
    pub settings: AppSettings,
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub csv: Option<PathBuf>,
}

impl BatchPlan {
    /// Load settings, apply CLI overrides, and check the dataset root and output directory.
    pub fn prepare(args: &RunArgs) -> Result<Self> {
        let mut settings = load_settings(args.config.as_deref())?;
        apply_cli_overrides(&mut settings, args);
        configure_telemetry(
            settings.telemetry.enabled,
            settings.telemetry.level_filter(),
        );

        let root = normalize_path(&args.input)
            .with_context(|| format!("dataset root {} is missing", args.input.display()))?;
        fs::create_dir_all(&args.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                args.output_dir.display()
            )
        })?;
        let output_dir = normalize_path(&args.output_dir)?;

        Ok(Self {
            settings,
            root,
            output_dir,
            csv: args.csv.clone(),
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(&self.settings.run.report_name)
    }
}

/// Execute a full batch with the configured YOLOv5 model and return the report summary.
pub fn run(args: &RunArgs) -> Result<ReportSummary> {
    let plan = BatchPlan::prepare(args)?;
    let detector = load_detector(&plan.settings)?;
    run_with_detector(&plan, &detector)
}

fn load_detector(settings: &AppSettings) -> Result<YoloDetector> {
    let preprocess_config: PreprocessConfig = settings.input.into();
    let postprocess_config: PostprocessConfig = (&settings.detection).into();
    let input_size = preprocess_config.input_size;
    let model = model_path(settings);
    info!(
        "Loading YOLOv5 face model from {} at resolution {}x{} (facescan-core {})",
        model.display(),
        input_size.width,
        input_size.height,
        facescan_core::version()
    );
    YoloDetector::new(&model, preprocess_config, postprocess_config)
}

/// Traverse the dataset, process every image with `detector`, and write the report(s).
pub fn run_with_detector<D>(plan: &BatchPlan, detector: &D) -> Result<ReportSummary>
where
    D: FaceDetector + ?Sized,
{
    let images = collect_subject_images(&plan.root, &plan.settings.run)?;
    if images.is_empty() {
        warn!("No images found under {}", plan.root.display());
    }

    let options = PipelineOptions::from_run_settings(plan.output_dir.clone(), &plan.settings.run);
    let batch_timer = timing_guard_if("facescan_cli::batch", log::Level::Info, !images.is_empty());
    let report = run_batch(detector, &images, &options);
    drop(batch_timer);

    write_outputs(&report, &plan.report_path(), plan.csv.as_deref())?;

    let summary = report.summary();
    info!(
        "Processed {} of {} image(s): {} detected, {} without detection ({} failed)",
        report.len(),
        images.len(),
        summary.detected,
        summary.not_detected,
        summary.failed
    );
    Ok(summary)
}

fn write_outputs(report: &Report, xlsx_path: &Path, csv_path: Option<&Path>) -> Result<()> {
    report.write_xlsx(xlsx_path)?;
    info!("Detection details saved to {}", xlsx_path.display());
    if let Some(csv_path) = csv_path {
        report.write_csv(csv_path)?;
    }
    Ok(())
}
