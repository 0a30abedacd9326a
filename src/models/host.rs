// Host identity, interface counters and the on-demand health report

use super::{ProbeSample, ResourceSample};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfo {
    pub hostname: String,
    /// OS pretty name, e.g. "Linux (Debian GNU/Linux 12)".
    pub os: String,
    pub kernel: String,
    pub uptime_seconds: u64,
    /// "<d> days <h> hours <m> minutes".
    pub uptime_formatted: String,
}

/// Cumulative counters of the primary interface since boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCounters {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_mb: f64,
    pub tx_mb: f64,
}

/// Live snapshot built on request. Nothing in it is persisted.
///
/// A section that could not be read is `None` and its reason is listed in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub generated_at: i64,
    pub execution_time_ms: f64,
    pub host_info: Option<HostInfo>,
    pub resources: Option<ResourceSample>,
    pub network: Option<NetworkCounters>,
    /// One fresh probe per enabled target, sorted by address.
    pub targets: Vec<ProbeSample>,
    pub errors: Vec<String>,
}
