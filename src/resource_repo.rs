// Host resource sampling via sysinfo (load average, memory, disk of one mount),
// plus host identity and primary-interface counters for the health report

use crate::models::{HostInfo, NetworkCounters, ResourceSample, round2};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use sysinfo::{Disks, Networks, System};
use tracing::instrument;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const ROUTE_TABLE: &str = "/proc/net/route";

/// Raw readings before derivation; kept separate so the arithmetic is testable.
#[derive(Debug, Clone, Copy)]
pub struct HostReadings {
    pub load: (f64, f64, f64),
    pub logical_cores: usize,
    pub mem_total_bytes: u64,
    pub mem_available_bytes: u64,
    pub disk_total_bytes: u64,
    pub disk_available_bytes: u64,
}

pub struct ResourceRepo {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
    networks: Arc<Mutex<Networks>>,
    disk_path: PathBuf,
}

impl ResourceRepo {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_list(sysinfo::CpuRefreshKind::nothing());
        sys.refresh_memory();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            disk_path: disk_path.into(),
        }
    }

    #[instrument(skip(self), fields(repo = "resources", operation = "sample"))]
    pub async fn sample(&self, timestamp: i64) -> anyhow::Result<ResourceSample> {
        let sys = self.sys.clone();
        let disks = self.disks.clone();
        let disk_path = self.disk_path.clone();
        tokio::task::spawn_blocking(move || {
            let (logical_cores, mem_total_bytes, mem_available_bytes) = {
                let mut sys = sys
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
                sys.refresh_memory();
                let cores = match sys.cpus().len() {
                    0 => std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(1),
                    n => n,
                };
                (cores, sys.total_memory(), sys.available_memory())
            };

            let (disk_total_bytes, disk_available_bytes) = {
                let mut disks = disks
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
                disks.refresh(false);
                let mounts: Vec<(PathBuf, u64, u64)> = disks
                    .list()
                    .iter()
                    .map(|d| {
                        (
                            d.mount_point().to_path_buf(),
                            d.total_space(),
                            d.available_space(),
                        )
                    })
                    .collect();
                let idx = best_mount(&disk_path, mounts.iter().map(|(m, _, _)| m.as_path()))
                    .ok_or_else(|| {
                        anyhow::anyhow!("no mounted filesystem contains {}", disk_path.display())
                    })?;
                (mounts[idx].1, mounts[idx].2)
            };

            let load = System::load_average();
            Ok(derive_sample(
                timestamp,
                HostReadings {
                    load: (load.one, load.five, load.fifteen),
                    logical_cores,
                    mem_total_bytes,
                    mem_available_bytes,
                    disk_total_bytes,
                    disk_available_bytes,
                },
            ))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }

    #[instrument(skip(self), fields(repo = "resources", operation = "host_info"))]
    pub async fn host_info(&self) -> anyhow::Result<HostInfo> {
        tokio::task::spawn_blocking(|| {
            let os = match (System::name(), System::long_os_version()) {
                (Some(name), Some(long)) if !long.contains(&name) => format!("{name} ({long})"),
                (_, Some(long)) => long,
                (Some(name), None) => name,
                (None, None) => "unknown".to_string(),
            };
            let uptime_seconds = System::uptime();
            HostInfo {
                hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
                os,
                kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
                uptime_seconds,
                uptime_formatted: format_uptime(uptime_seconds),
            }
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))
    }

    /// Counters of the default-route interface, or of the busiest non-loopback one.
    #[instrument(skip(self), fields(repo = "resources", operation = "network_stats"))]
    pub async fn network_stats(&self) -> anyhow::Result<NetworkCounters> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut networks = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            networks.refresh(true);

            let default_iface = std::fs::read_to_string(ROUTE_TABLE)
                .ok()
                .and_then(|table| default_route_interface(&table))
                .filter(|name| networks.list().contains_key(name));
            let name = match default_iface {
                Some(name) => name,
                None => {
                    let totals: Vec<(&str, u64)> = networks
                        .list()
                        .iter()
                        .map(|(name, data)| {
                            (
                                name.as_str(),
                                data.total_received() + data.total_transmitted(),
                            )
                        })
                        .collect();
                    pick_primary(&totals)
                        .ok_or_else(|| anyhow::anyhow!("no network interface besides loopback"))?
                        .to_string()
                }
            };
            let data = networks
                .list()
                .get(&name)
                .ok_or_else(|| anyhow::anyhow!("interface {} disappeared", name))?;
            Ok(NetworkCounters {
                rx_bytes: data.total_received(),
                tx_bytes: data.total_transmitted(),
                rx_packets: data.total_packets_received(),
                tx_packets: data.total_packets_transmitted(),
                rx_mb: round2(data.total_received() as f64 / BYTES_PER_MB),
                tx_mb: round2(data.total_transmitted() as f64 / BYTES_PER_MB),
                interface: name,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

pub fn format_uptime(seconds: u64) -> String {
    format!(
        "{} days {} hours {} minutes",
        seconds / 86_400,
        seconds % 86_400 / 3_600,
        seconds % 3_600 / 60
    )
}

/// Interface of the first default route (destination `00000000`) in a
/// `/proc/net/route` table.
pub fn default_route_interface(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let mut cols = line.split_whitespace();
        let iface = cols.next()?;
        (cols.next()? == "00000000").then(|| iface.to_string())
    })
}

/// Busiest non-loopback interface by total bytes; ties go to the lowest name.
pub fn pick_primary<'a>(totals: &[(&'a str, u64)]) -> Option<&'a str> {
    totals
        .iter()
        .filter(|(name, _)| *name != "lo")
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| *name)
}

/// Index of the mount point that is the longest path prefix of `path`.
pub fn best_mount<'a>(path: &Path, mounts: impl Iterator<Item = &'a Path>) -> Option<usize> {
    mounts
        .enumerate()
        .filter(|(_, m)| path.starts_with(m))
        .max_by_key(|(_, m)| m.components().count())
        .map(|(i, _)| i)
}

/// CPU % is 1-minute load / logical cores x 100; this is not true utilization
/// and exceeds 100 when the run queue is longer than the core count.
pub fn derive_sample(timestamp: i64, r: HostReadings) -> ResourceSample {
    let cores = r.logical_cores.max(1) as f64;
    let cpu_usage_pct = r.load.0 / cores * 100.0;

    let mem_used = r.mem_total_bytes.saturating_sub(r.mem_available_bytes);
    let mem_usage_pct = percent(mem_used, r.mem_total_bytes);

    let disk_used = r.disk_total_bytes.saturating_sub(r.disk_available_bytes);
    let disk_usage_pct = percent(disk_used, r.disk_total_bytes);

    ResourceSample {
        timestamp,
        cpu_usage_pct: round2(cpu_usage_pct),
        cpu_load_1: round2(r.load.0),
        cpu_load_5: round2(r.load.1),
        cpu_load_15: round2(r.load.2),
        mem_usage_pct: round2(mem_usage_pct),
        mem_used_mb: (mem_used as f64 / BYTES_PER_MB).round() as i64,
        mem_total_mb: (r.mem_total_bytes as f64 / BYTES_PER_MB).round() as i64,
        disk_usage_pct: round2(disk_usage_pct),
        disk_used_gb: round2(disk_used as f64 / BYTES_PER_GB),
        disk_total_gb: round2(r.disk_total_bytes as f64 / BYTES_PER_GB),
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> HostReadings {
        HostReadings {
            load: (2.0, 1.5, 1.0),
            logical_cores: 4,
            mem_total_bytes: 8 * 1024 * 1024 * 1024,
            mem_available_bytes: 6 * 1024 * 1024 * 1024,
            disk_total_bytes: 100 * 1024 * 1024 * 1024,
            disk_available_bytes: 25 * 1024 * 1024 * 1024,
        }
    }

    #[test]
    fn derive_sample_computes_percentages() {
        let s = derive_sample(1_000, readings());
        assert_eq!(s.timestamp, 1_000);
        assert_eq!(s.cpu_usage_pct, 50.0);
        assert_eq!(s.cpu_load_5, 1.5);
        assert_eq!(s.mem_usage_pct, 25.0);
        assert_eq!(s.mem_used_mb, 2048);
        assert_eq!(s.mem_total_mb, 8192);
        assert_eq!(s.disk_usage_pct, 75.0);
        assert_eq!(s.disk_used_gb, 75.0);
        assert_eq!(s.disk_total_gb, 100.0);
    }

    #[test]
    fn cpu_usage_can_exceed_100_under_load() {
        let mut r = readings();
        r.load = (9.0, 4.0, 2.0);
        let s = derive_sample(0, r);
        assert_eq!(s.cpu_usage_pct, 225.0);
    }

    #[test]
    fn zero_totals_do_not_divide_by_zero() {
        let r = HostReadings {
            load: (0.0, 0.0, 0.0),
            logical_cores: 0,
            mem_total_bytes: 0,
            mem_available_bytes: 0,
            disk_total_bytes: 0,
            disk_available_bytes: 0,
        };
        let s = derive_sample(0, r);
        assert_eq!(s.cpu_usage_pct, 0.0);
        assert_eq!(s.mem_usage_pct, 0.0);
        assert_eq!(s.disk_usage_pct, 0.0);
    }

    #[test]
    fn best_mount_picks_longest_prefix() {
        let mounts = [Path::new("/"), Path::new("/var"), Path::new("/var/lib/data")];
        let idx = best_mount(Path::new("/var/lib/data/db"), mounts.iter().copied());
        assert_eq!(idx, Some(2));
        let idx = best_mount(Path::new("/home"), mounts.iter().copied());
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn format_uptime_splits_days_hours_minutes() {
        assert_eq!(format_uptime(0), "0 days 0 hours 0 minutes");
        assert_eq!(format_uptime(59), "0 days 0 hours 0 minutes");
        assert_eq!(
            format_uptime(3 * 86_400 + 4 * 3_600 + 5 * 60 + 6),
            "3 days 4 hours 5 minutes"
        );
    }

    #[test]
    fn default_route_interface_reads_route_table() {
        let table = "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT\n\
            docker0\t000011AC\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0\n\
            enp3s0\t00000000\t0101A8C0\t0003\t0\t0\t100\t00000000\t0\t0\t0\n";
        assert_eq!(default_route_interface(table).as_deref(), Some("enp3s0"));
    }

    #[test]
    fn default_route_interface_none_without_default() {
        let table = "Iface\tDestination\tGateway\n\
            eth0\t0001A8C0\t00000000\n";
        assert_eq!(default_route_interface(table), None);
        assert_eq!(default_route_interface(""), None);
    }

    #[test]
    fn pick_primary_skips_loopback() {
        let totals = [("lo", 9_000_000), ("eth1", 10), ("eth0", 500)];
        assert_eq!(pick_primary(&totals), Some("eth0"));
        assert_eq!(pick_primary(&[("lo", 1)]), None);
        assert_eq!(pick_primary(&[("b", 5), ("a", 5)]), Some("a"));
    }

    #[test]
    fn best_mount_none_when_nothing_matches() {
        let mounts = [Path::new("/boot")];
        assert_eq!(best_mount(Path::new("/"), mounts.iter().copied()), None);
    }
}
