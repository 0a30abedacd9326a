//! Reachability probes.
//!
//! A probe either fails fast with [`ProbeError::InvalidTarget`] (nothing is
//! executed) or returns a [`ProbeResult`]; timeouts and unreachable hosts are
//! data, carried in `ProbeResult::error`, not errors.

pub mod parser;
mod ping;
mod round;

pub use ping::PingProber;
pub use round::{ProbeRound, probe_with_deadline};

use crate::models::round2;
use parser::{PingOutput, PingStats};
use serde::Serialize;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Probe error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("invalid target address: {0:?}")]
    InvalidTarget(String),
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("unreachable: {0}")]
    Unreachable(String),
}

/// Probe configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    /// Echo requests per probe.
    pub count: u32,
    /// Per-reply wait.
    pub timeout: Duration,
}

impl ProbeConfig {
    pub fn new(count: u32, timeout: Duration) -> Self {
        Self {
            count: count.max(1),
            timeout,
        }
    }

    /// Hard limit for one probe: one second per echo plus the reply wait and a grace second.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.count as u64) + self.timeout + Duration::from_secs(1)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(2))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub reachable: bool,
    pub latency_ms: Option<f64>,
    pub packet_loss_pct: f64,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub error: Option<String>,
}

impl ProbeResult {
    /// Nothing came back; every packet counts as lost.
    pub fn failed(packets_sent: u32, error: &ProbeError) -> Self {
        Self {
            reachable: false,
            latency_ms: None,
            packet_loss_pct: 100.0,
            packets_sent,
            packets_received: 0,
            error: Some(error.to_string()),
        }
    }

    /// Build a result from parsed ping output. Unparseable output is never
    /// treated as success; the raw text is kept in `error`.
    pub fn from_output(output: &PingOutput, expected_count: u32) -> Self {
        match output {
            PingOutput::Parsed(stats) => Self::from_stats(stats),
            PingOutput::HardError(msg) => {
                Self::failed(expected_count, &ProbeError::Unreachable(msg.clone()))
            }
            PingOutput::Unparseable(raw) => Self::failed(
                expected_count,
                &ProbeError::Unreachable(format!("unparseable probe output: {}", raw.trim())),
            ),
        }
    }

    fn from_stats(stats: &PingStats) -> Self {
        match (stats.received, stats.rtt_avg_ms) {
            (received, Some(avg)) if received > 0 => Self {
                reachable: true,
                latency_ms: Some(round2(avg.max(0.0))),
                packet_loss_pct: round2(stats.loss_pct),
                packets_sent: stats.transmitted,
                packets_received: received,
                error: None,
            },
            (received, None) if received > 0 => Self {
                reachable: false,
                latency_ms: None,
                packet_loss_pct: round2(stats.loss_pct),
                packets_sent: stats.transmitted,
                packets_received: received,
                error: Some(
                    ProbeError::Unreachable("replies without round-trip time".into()).to_string(),
                ),
            },
            _ => Self {
                reachable: false,
                latency_ms: None,
                packet_loss_pct: round2(stats.loss_pct),
                packets_sent: stats.transmitted,
                packets_received: 0,
                error: Some(
                    ProbeError::Unreachable(
                        stats
                            .failure
                            .clone()
                            .unwrap_or_else(|| "no reply received".into()),
                    )
                    .to_string(),
                ),
            },
        }
    }
}

/// Validate a target before anything is executed. Only literal IP addresses pass,
/// so the value can never be read as an option or shell syntax.
pub fn validate_target(address: &str) -> Result<IpAddr, ProbeError> {
    address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ProbeError::InvalidTarget(address.to_string()))
}

/// A reachability check against one address.
pub trait Prober: Send + Sync + 'static {
    fn probe(&self, address: &str) -> impl Future<Output = Result<ProbeResult, ProbeError>> + Send;

    /// Upper bound on how long one `probe` call may take.
    fn deadline(&self) -> Duration;

    /// Echo requests per probe, reported as sent when a probe is abandoned.
    fn packets_per_probe(&self) -> u32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_target_accepts_ipv4_and_ipv6() {
        assert!(validate_target("10.0.0.1").is_ok());
        assert!(validate_target("::1").is_ok());
        assert!(validate_target(" 192.168.1.254 ").is_ok());
    }

    #[test]
    fn validate_target_rejects_control_strings() {
        for bad in ["", "-f", "10.0.0.1; rm -rf /", "$(reboot)", "example.com", "10.0.0.256"] {
            assert_eq!(
                validate_target(bad),
                Err(ProbeError::InvalidTarget(bad.to_string()))
            );
        }
    }

    #[test]
    fn partial_loss_is_still_reachable() {
        let stats = PingStats {
            transmitted: 4,
            received: 3,
            loss_pct: 25.0,
            rtt_avg_ms: Some(1.23456),
            failure: None,
        };
        let r = ProbeResult::from_output(&PingOutput::Parsed(stats), 4);
        assert!(r.reachable);
        assert_eq!(r.latency_ms, Some(1.23));
        assert_eq!(r.packet_loss_pct, 25.0);
        assert_eq!(r.packets_received, 3);
        assert!(r.error.is_none());
    }

    #[test]
    fn zero_received_is_unreachable_without_latency() {
        let stats = PingStats {
            transmitted: 4,
            received: 0,
            loss_pct: 100.0,
            rtt_avg_ms: None,
            failure: Some("Destination Host Unreachable".into()),
        };
        let r = ProbeResult::from_output(&PingOutput::Parsed(stats), 4);
        assert!(!r.reachable);
        assert_eq!(r.latency_ms, None);
        assert_eq!(r.packet_loss_pct, 100.0);
        assert_eq!(
            r.error.as_deref(),
            Some("unreachable: Destination Host Unreachable")
        );
    }

    #[test]
    fn unparseable_output_keeps_raw_text() {
        let r = ProbeResult::from_output(&PingOutput::Unparseable("garbage\n".into()), 2);
        assert!(!r.reachable);
        assert_eq!(r.latency_ms, None);
        assert_eq!(r.packets_sent, 2);
        assert_eq!(r.packets_received, 0);
        assert!(r.error.as_deref().unwrap().contains("garbage"));
    }

    #[test]
    fn deadline_covers_count_and_timeout() {
        let c = ProbeConfig::new(4, Duration::from_secs(2));
        assert_eq!(c.deadline(), Duration::from_secs(7));
        assert_eq!(ProbeConfig::new(0, Duration::from_secs(1)).count, 1);
    }
}
