// Resource and probe samples: one row each in the time-series store

use super::Target;
use crate::probe::ProbeResult;
use serde::{Deserialize, Serialize};

/// Host resource usage at one resource tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// 1-minute load / logical cores x 100. Can exceed 100 under load bursts.
    pub cpu_usage_pct: f64,
    pub cpu_load_1: f64,
    pub cpu_load_5: f64,
    pub cpu_load_15: f64,
    pub mem_usage_pct: f64,
    pub mem_used_mb: i64,
    pub mem_total_mb: i64,
    pub disk_usage_pct: f64,
    pub disk_used_gb: f64,
    pub disk_total_gb: f64,
}

/// One probe against one target at one probe tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSample {
    /// Tick boundary this probe belongs to (ms since the Unix epoch).
    pub timestamp: i64,
    pub target_address: String,
    pub target_name: Option<String>,
    pub reachable: bool,
    /// Present only when `reachable` is true.
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: f64,
    pub packets_sent: u32,
    pub packets_received: u32,
    /// Failure reason or unparseable probe output, kept for diagnostics.
    pub error: Option<String>,
}

impl ProbeSample {
    /// Sample for `target` at tick `timestamp`. Latency is kept only for a reply.
    pub fn from_result(timestamp: i64, target: &Target, result: ProbeResult) -> Self {
        Self {
            timestamp,
            target_address: target.address.clone(),
            target_name: target.name(),
            reachable: result.reachable,
            latency_ms: if result.reachable { result.latency_ms } else { None },
            packet_loss_pct: result.packet_loss_pct,
            packets_sent: result.packets_sent,
            packets_received: result.packets_received,
            error: result.error,
        }
    }
}

/// Rows removed by one purge, per stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeCounts {
    pub resource_samples: u64,
    pub probe_samples: u64,
}

impl PurgeCounts {
    pub fn total(&self) -> u64 {
        self.resource_samples + self.probe_samples
    }
}
