use log::{log_enabled, trace, warn, Level};
use std::time::Instant;

/// Wall-clock budget for one simulation frame at 60 Hz.
pub const DEFAULT_FRAME_BUDGET_MS: f32 = 16.0;

/// Scoped timer around a frame pass.
///
/// Emits `trace!` records on entry and exit with the elapsed microseconds.
/// When constructed with a budget, an overrun upgrades the exit record to a
/// `warn!` so slow frames surface without trace logging enabled.
pub struct ScopedTimer<'a> {
    label: &'a str,
    budget_ms: Option<f32>,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        Self::build(label, None)
    }

    /// Timer that escalates to `warn!` past `budget_ms` of wall-clock time.
    pub fn with_budget(label: &'a str, budget_ms: f32) -> Self {
        Self::build(label, Some(budget_ms))
    }

    fn build(label: &'a str, budget_ms: Option<f32>) -> Self {
        if log_enabled!(Level::Trace) {
            trace!("begin {label}");
        }
        Self {
            label,
            budget_ms,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let elapsed_ms = elapsed.as_secs_f32() * 1000.0;
        match self.budget_ms {
            Some(budget) if elapsed_ms > budget => {
                warn!(
                    "{} exceeded budget: {elapsed_ms:.2} ms > {budget:.2} ms",
                    self.label
                );
            }
            _ => {
                if log_enabled!(Level::Trace) {
                    trace!("end {} ({} µs)", self.label, elapsed.as_micros());
                }
            }
        }
    }
}
