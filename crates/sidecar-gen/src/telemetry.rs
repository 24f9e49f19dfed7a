//! Sidecar build metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

use std::time::Duration;

use metrics::Unit;

pub const BUILDS_TOTAL: &str = "sidecar_builds_total";
pub const BUILD_FAILURES_TOTAL: &str = "sidecar_build_failures_total";
pub const SIDECARS_BUILT_TOTAL: &str = "sidecars_built_total";
pub const BUILD_DURATION_SECONDS: &str = "sidecar_build_duration_seconds";

/// Attach help text and units to the build metrics on the installed recorder.
pub fn describe() {
    metrics::describe_counter!(BUILDS_TOTAL, "Sidecar build requests");
    metrics::describe_counter!(BUILD_FAILURES_TOTAL, "Failed sidecar builds by reason");
    metrics::describe_counter!(SIDECARS_BUILT_TOTAL, "Blob sidecars produced");
    metrics::describe_histogram!(
        BUILD_DURATION_SECONDS,
        Unit::Seconds,
        "Time to build all sidecars of a block"
    );
}

pub(crate) fn record_build_started() {
    metrics::counter!(BUILDS_TOTAL).increment(1);
}

pub(crate) fn record_build_succeeded(sidecars: usize, elapsed: Duration) {
    metrics::counter!(SIDECARS_BUILT_TOTAL).increment(sidecars as u64);
    metrics::histogram!(BUILD_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub(crate) fn record_build_failed(reason: &'static str) {
    metrics::counter!(BUILD_FAILURES_TOTAL, "reason" => reason).increment(1);
}
