// Windowed statistics computed on demand by the aggregator (never persisted).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// avg/min/max over one metric. All `None` when `samples == 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub samples: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    pub cpu: MetricStats,
    pub memory: MetricStats,
    pub disk: MetricStats,
    pub period_hours: u32,
    pub has_data: bool,
    /// Set when the store could not be read; distinguishes failure from "no data yet".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceStats {
    pub fn empty(period_hours: u32) -> Self {
        Self {
            cpu: MetricStats::default(),
            memory: MetricStats::default(),
            disk: MetricStats::default(),
            period_hours,
            has_data: false,
            error: None,
        }
    }
}

/// Latency, loss and availability of one target over the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeStats {
    pub address: String,
    pub name: Option<String>,
    /// Latency figures cover reachable samples only.
    pub avg_latency_ms: Option<f64>,
    pub min_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
    pub avg_packet_loss: Option<f64>,
    pub availability_pct: Option<f64>,
    pub samples: u64,
    pub period_hours: u32,
    pub has_data: bool,
}

impl ProbeStats {
    pub fn empty(address: &str, period_hours: u32) -> Self {
        Self {
            address: address.to_string(),
            name: None,
            avg_latency_ms: None,
            min_latency_ms: None,
            max_latency_ms: None,
            avg_packet_loss: None,
            availability_pct: None,
            samples: 0,
            period_hours,
            has_data: false,
        }
    }
}

/// Per-target probe statistics keyed by address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeStatsReport {
    pub period_hours: u32,
    pub targets: BTreeMap<String, ProbeStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    pub cpu_avg: Option<f64>,
    pub memory_avg: Option<f64>,
    pub disk_avg: Option<f64>,
    pub samples: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSummary {
    /// Targets with at least one sample in the window.
    pub targets_monitored: usize,
    /// Mean availability over `targets_monitored`; `None` when there are none.
    pub overall_availability: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub system: SystemSummary,
    pub probes: ProbeSummary,
    pub period_hours: u32,
    /// Milliseconds since the Unix epoch.
    pub generated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Most recent resource sample plus the most recent probe of every target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestStatus {
    pub resources: Option<super::ResourceSample>,
    pub probes: Vec<super::ProbeSample>,
}
