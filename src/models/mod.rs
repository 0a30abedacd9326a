// Domain models

mod host;
mod sample;
mod stats;
mod target;

pub use host::{HealthReport, HostInfo, NetworkCounters};
pub use sample::{ProbeSample, PurgeCounts, ResourceSample};
pub use stats::{
    LatestStatus, MetricStats, ProbeStats, ProbeStatsReport, ProbeSummary, ResourceStats,
    Summary, SystemSummary,
};
pub use target::{Target, TargetPatch};

/// Milliseconds since the Unix epoch (0 if the system clock is before it).
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
