//! Lightweight timing utilities for optional performance tracing.
//!
//! A [`TimingGuard`] records the elapsed duration of a scoped operation and logs it on drop.
//! Logging only happens when telemetry was switched on through [`configure`] and the log
//! filter allows the requested level. Callers that need the measured duration itself (the
//! per-image detection latency, for instance) use [`TimingGuard::finish`].

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

/// Log target used for all telemetry output.
pub const TELEMETRY_TARGET: &str = "facescan::telemetry";

static TELEMETRY_ENABLED: AtomicBool = AtomicBool::new(false);
static TELEMETRY_LEVEL: AtomicU8 = AtomicU8::new(0);

/// RAII helper that logs how long an operation took when dropped.
pub struct TimingGuard {
    label: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    fn new(label: Cow<'static, str>, level: Level, active: bool) -> Self {
        Self {
            label,
            level,
            start: Instant::now(),
            active,
        }
    }

    /// Returns `true` when the guard will emit a log entry on drop.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Consume the guard and return the elapsed duration.
    ///
    /// The duration is still logged when the guard is active.
    pub fn finish(mut self) -> Duration {
        let duration = self.start.elapsed();
        if self.active {
            emit(&self.label, self.level, duration);
        }
        self.active = false;
        duration
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.active {
            emit(&self.label, self.level, self.start.elapsed());
        }
    }
}

fn emit(label: &str, level: Level, duration: Duration) {
    log!(
        target: TELEMETRY_TARGET,
        level,
        "{} completed in {:.2?}",
        label,
        duration
    );
}

/// Create a timing guard that logs at the provided level when telemetry allows it.
pub fn timing_guard(label: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(label, level, true)
}

/// Create a timing guard that also respects an explicit boolean flag.
pub fn timing_guard_if(
    label: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    let active =
        enabled && telemetry_allows(level) && log_enabled!(target: TELEMETRY_TARGET, level);
    TimingGuard::new(label.into(), level, active)
}

/// Configure the global telemetry state.
pub fn configure(enabled: bool, level: LevelFilter) {
    TELEMETRY_ENABLED.store(enabled, Ordering::Relaxed);
    TELEMETRY_LEVEL.store(filter_index(level), Ordering::Relaxed);
}

/// Returns whether telemetry logging is currently enabled.
pub fn telemetry_enabled() -> bool {
    TELEMETRY_ENABLED.load(Ordering::Relaxed)
}

/// Returns `true` when telemetry is enabled and `level` is within the configured threshold.
pub fn telemetry_allows(level: Level) -> bool {
    telemetry_enabled() && level as u8 <= TELEMETRY_LEVEL.load(Ordering::Relaxed)
}

fn filter_index(filter: LevelFilter) -> u8 {
    match filter.to_level() {
        Some(level) => level as u8,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reports_elapsed_time_without_telemetry() {
        let guard = timing_guard_if("test", Level::Debug, false);
        assert!(!guard.is_active());
        std::thread::sleep(Duration::from_millis(5));
        let elapsed = guard.finish();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn level_threshold_is_respected() {
        configure(true, LevelFilter::Info);
        assert!(telemetry_allows(Level::Warn));
        assert!(telemetry_allows(Level::Info));
        assert!(!telemetry_allows(Level::Debug));

        configure(false, LevelFilter::Trace);
        assert!(!telemetry_allows(Level::Error));
    }
}
