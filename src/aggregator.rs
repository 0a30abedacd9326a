// Windowed statistics over stored samples. Pure aggregation functions plus the
// store-backed Aggregator used by the HTTP layer. Never writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{
    MetricStats, ProbeSample, ProbeStats, ProbeStatsReport, ProbeSummary, ResourceSample,
    ResourceStats, Summary, SystemSummary, now_ms, round2,
};
use crate::sample_repo::SampleRepo;
use tracing::instrument;

const MS_PER_HOUR: i64 = 3_600_000;

pub struct Aggregator {
    repo: Arc<SampleRepo>,
}

impl Aggregator {
    pub fn new(repo: Arc<SampleRepo>) -> Self {
        Self { repo }
    }

    /// cpu / memory / disk avg-min-max over the trailing window. A failed read
    /// yields the no-data shape with `error` set.
    #[instrument(skip(self), fields(operation = "compute_resource_stats"))]
    pub async fn compute_resource_stats(&self, window_hours: u32) -> ResourceStats {
        let since = window_start(now_ms(), window_hours);
        match self.repo.query_resources_since(since).await {
            Ok(samples) => resource_stats(&samples, window_hours),
            Err(e) => {
                tracing::warn!(error = %e, operation = "query_resources_since", "resource stats unavailable");
                ResourceStats {
                    error: Some(e.to_string()),
                    ..ResourceStats::empty(window_hours)
                }
            }
        }
    }

    /// Per-target probe statistics; restricted to one address when `target` is set.
    #[instrument(skip(self), fields(operation = "compute_probe_stats"))]
    pub async fn compute_probe_stats(
        &self,
        window_hours: u32,
        target: Option<&str>,
    ) -> ProbeStatsReport {
        let since = window_start(now_ms(), window_hours);
        let (mut targets, error) = match self.repo.query_probes_since(since, target).await {
            Ok(samples) => (probe_stats(&samples, window_hours), None),
            Err(e) => {
                tracing::warn!(error = %e, operation = "query_probes_since", "probe stats unavailable");
                (BTreeMap::new(), Some(e.to_string()))
            }
        };
        if let Some(address) = target {
            targets
                .entry(address.to_string())
                .or_insert_with(|| ProbeStats::empty(address, window_hours));
        }
        ProbeStatsReport {
            period_hours: window_hours,
            targets,
            error,
        }
    }

    pub async fn compute_summary(&self, window_hours: u32) -> Summary {
        let resources = self.compute_resource_stats(window_hours).await;
        let probes = self.compute_probe_stats(window_hours, None).await;
        summarize(&resources, &probes, now_ms())
    }
}

/// First timestamp (inclusive) of a window of `hours` ending at `now`.
pub fn window_start(now: i64, hours: u32) -> i64 {
    now - hours as i64 * MS_PER_HOUR
}

pub fn metric_stats(values: &[f64]) -> MetricStats {
    if values.is_empty() {
        return MetricStats::default();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MetricStats {
        avg: Some(round2(mean_f64(values))),
        min: Some(round2(min)),
        max: Some(round2(max)),
        samples: values.len() as u64,
    }
}

pub fn resource_stats(samples: &[ResourceSample], period_hours: u32) -> ResourceStats {
    if samples.is_empty() {
        return ResourceStats::empty(period_hours);
    }
    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_usage_pct).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.mem_usage_pct).collect();
    let disk: Vec<f64> = samples.iter().map(|s| s.disk_usage_pct).collect();
    ResourceStats {
        cpu: metric_stats(&cpu),
        memory: metric_stats(&memory),
        disk: metric_stats(&disk),
        period_hours,
        has_data: true,
        error: None,
    }
}

/// Groups by target address; each target is aggregated independently.
pub fn probe_stats(samples: &[ProbeSample], period_hours: u32) -> BTreeMap<String, ProbeStats> {
    let mut by_target: BTreeMap<&str, Vec<&ProbeSample>> = BTreeMap::new();
    for s in samples {
        by_target.entry(s.target_address.as_str()).or_default().push(s);
    }
    by_target
        .into_iter()
        .map(|(address, group)| (address.to_string(), target_stats(address, &group, period_hours)))
        .collect()
}

fn target_stats(address: &str, samples: &[&ProbeSample], period_hours: u32) -> ProbeStats {
    if samples.is_empty() {
        return ProbeStats::empty(address, period_hours);
    }
    let latencies: Vec<f64> = samples
        .iter()
        .filter(|s| s.reachable)
        .filter_map(|s| s.latency_ms)
        .collect();
    let latency = metric_stats(&latencies);
    let losses: Vec<f64> = samples.iter().map(|s| s.packet_loss_pct).collect();
    let reachable = samples.iter().filter(|s| s.reachable).count();
    let availability = reachable as f64 / samples.len() as f64 * 100.0;
    // latest non-empty name wins if a target was renamed inside the window
    let name = samples.iter().rev().find_map(|s| s.target_name.clone());

    ProbeStats {
        address: address.to_string(),
        name,
        avg_latency_ms: latency.avg,
        min_latency_ms: latency.min,
        max_latency_ms: latency.max,
        avg_packet_loss: Some(round2(mean_f64(&losses))),
        availability_pct: Some(round2(availability)),
        samples: samples.len() as u64,
        period_hours,
        has_data: true,
    }
}

/// Overall availability averages targets with at least one sample; targets
/// without samples are left out rather than counted as 0%.
pub fn summarize(resources: &ResourceStats, probes: &ProbeStatsReport, generated_at: i64) -> Summary {
    let availabilities: Vec<f64> = probes
        .targets
        .values()
        .filter(|t| t.samples > 0)
        .filter_map(|t| t.availability_pct)
        .collect();
    let overall_availability = if availabilities.is_empty() {
        None
    } else {
        Some(round2(mean_f64(&availabilities)))
    };
    let error = match (&resources.error, &probes.error) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (Some(e), None) | (None, Some(e)) => Some(e.clone()),
        (None, None) => None,
    };

    Summary {
        system: SystemSummary {
            cpu_avg: resources.cpu.avg,
            memory_avg: resources.memory.avg,
            disk_avg: resources.disk.avg,
            samples: resources.cpu.samples,
        },
        probes: ProbeSummary {
            targets_monitored: availabilities.len(),
            overall_availability,
        },
        period_hours: resources.period_hours,
        generated_at,
        error,
    }
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
