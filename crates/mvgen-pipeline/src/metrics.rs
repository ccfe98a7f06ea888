//! Stage metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};
use mvgen_models::{Stage, StageStatus};

/// Metric names as constants for consistency.
pub mod names {
    pub const STAGE_OUTCOMES_TOTAL: &str = "mvgen_stage_outcomes_total";
    pub const STAGE_DURATION_SECONDS: &str = "mvgen_stage_duration_seconds";
    pub const PROVIDER_FAILURES_TOTAL: &str = "mvgen_provider_failures_total";
}

/// Record the terminal status of a stage run.
pub fn record_stage_outcome(stage: Stage, status: StageStatus, duration_secs: f64) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("status", status.as_str().to_string()),
    ];
    counter!(names::STAGE_OUTCOMES_TOTAL, &labels).increment(1);

    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed primary provider call.
pub fn record_provider_failure(stage: Stage) {
    let labels = [("stage", stage.as_str().to_string())];
    counter!(names::PROVIDER_FAILURES_TOTAL, &labels).increment(1);
}
