// Shared test helpers
#![allow(dead_code)]

use healthmon::models::*;
use healthmon::probe::{ProbeError, ProbeResult, Prober, validate_target};
use healthmon::sample_repo::SampleRepo;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Fresh, initialized store in a temp dir. Keep the TempDir alive for the test.
pub async fn temp_repo() -> (TempDir, Arc<SampleRepo>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("samples.db");
    let repo = SampleRepo::connect(path.to_str().unwrap(), 2).await.unwrap();
    repo.init().await.unwrap();
    (dir, Arc::new(repo))
}

pub fn resource(timestamp: i64, cpu: f64, mem: f64, disk: f64) -> ResourceSample {
    ResourceSample {
        timestamp,
        cpu_usage_pct: cpu,
        cpu_load_1: cpu / 100.0 * 4.0,
        cpu_load_5: 0.5,
        cpu_load_15: 0.25,
        mem_usage_pct: mem,
        mem_used_mb: 2048,
        mem_total_mb: 8192,
        disk_usage_pct: disk,
        disk_used_gb: 40.0,
        disk_total_gb: 100.0,
    }
}

pub fn probe(timestamp: i64, address: &str, reachable: bool, latency: Option<f64>) -> ProbeSample {
    ProbeSample {
        timestamp,
        target_address: address.into(),
        target_name: Some(format!("host-{address}")),
        reachable,
        latency_ms: latency,
        packet_loss_pct: if reachable { 0.0 } else { 100.0 },
        packets_sent: 1,
        packets_received: u32::from(reachable),
        error: if reachable {
            None
        } else {
            Some("unreachable: no reply received".into())
        },
    }
}

/// Answers from a fixed set of reachable addresses; records every address it was asked about.
pub struct FakeProber {
    reachable: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProber {
    pub fn new(reachable: &[&str]) -> Self {
        Self {
            reachable: reachable.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Prober for FakeProber {
    async fn probe(&self, address: &str) -> Result<ProbeResult, ProbeError> {
        validate_target(address)?;
        self.calls.lock().unwrap().push(address.to_string());
        if self.reachable.contains(address) {
            Ok(ProbeResult {
                reachable: true,
                latency_ms: Some(0.42),
                packet_loss_pct: 0.0,
                packets_sent: 1,
                packets_received: 1,
                error: None,
            })
        } else {
            Ok(ProbeResult::failed(
                1,
                &ProbeError::Unreachable("no reply received".into()),
            ))
        }
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(2)
    }
}

/// Never answers for `stalled` addresses and panics for `broken` ones; every
/// other address answers at once as reachable.
pub struct StallingProber {
    stalled: HashSet<String>,
    broken: HashSet<String>,
    deadline: Duration,
}

impl StallingProber {
    pub fn new(stalled: &[&str], broken: &[&str], deadline: Duration) -> Self {
        Self {
            stalled: stalled.iter().map(|s| s.to_string()).collect(),
            broken: broken.iter().map(|s| s.to_string()).collect(),
            deadline,
        }
    }
}

impl Prober for StallingProber {
    async fn probe(&self, address: &str) -> Result<ProbeResult, ProbeError> {
        validate_target(address)?;
        if self.stalled.contains(address) {
            std::future::pending::<()>().await;
        }
        if self.broken.contains(address) {
            panic!("prober failure for {address}");
        }
        Ok(ProbeResult {
            reachable: true,
            latency_ms: Some(0.42),
            packet_loss_pct: 0.0,
            packets_sent: 1,
            packets_received: 1,
            error: None,
        })
    }

    fn deadline(&self) -> Duration {
        self.deadline
    }

    fn packets_per_probe(&self) -> u32 {
        3
    }
}
