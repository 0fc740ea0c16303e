//! Common helpers shared across facescan crates.

/// Run configuration and settings management.
pub mod config;
/// Image loading and size formatting.
pub mod image_utils;
/// Crop encoding helpers.
pub mod output;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, DetectionSettings, InputDimensions, RunSettings, TelemetrySettings};
pub use image_utils::{format_dimensions, has_image_extension, load_image};
pub use output::{ImageFormatHint, save_crop};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    timing_guard, timing_guard_if,
};

/// Initialize logging once for the CLI.
///
/// This function respects the `RUST_LOG` environment variable if it is set.
/// Otherwise, it falls back to the provided default filter level.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn normalize_path_rejects_missing_paths() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(normalize_path(&missing).is_err());
        assert!(normalize_path(dir.path()).unwrap().is_absolute());
    }
}
