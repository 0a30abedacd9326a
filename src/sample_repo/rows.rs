// Row <-> model mapping for the two sample tables.

use crate::models::{ProbeSample, ResourceSample};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub(super) const RESOURCE_COLUMNS: &str = "created_at, cpu_usage_pct, cpu_load_1, cpu_load_5, cpu_load_15, \
     mem_usage_pct, mem_used_mb, mem_total_mb, disk_usage_pct, disk_used_gb, disk_total_gb";

pub(super) const PROBE_COLUMNS: &str = "created_at, target_address, target_name, reachable, latency_ms, \
     packet_loss_pct, packets_sent, packets_received, error";

pub(super) fn parse_resource_row(row: &SqliteRow) -> anyhow::Result<ResourceSample> {
    Ok(ResourceSample {
        timestamp: row.try_get("created_at")?,
        cpu_usage_pct: row.try_get("cpu_usage_pct")?,
        cpu_load_1: row.try_get("cpu_load_1")?,
        cpu_load_5: row.try_get("cpu_load_5")?,
        cpu_load_15: row.try_get("cpu_load_15")?,
        mem_usage_pct: row.try_get("mem_usage_pct")?,
        mem_used_mb: row.try_get("mem_used_mb")?,
        mem_total_mb: row.try_get("mem_total_mb")?,
        disk_usage_pct: row.try_get("disk_usage_pct")?,
        disk_used_gb: row.try_get("disk_used_gb")?,
        disk_total_gb: row.try_get("disk_total_gb")?,
    })
}

pub(super) fn parse_probe_row(row: &SqliteRow) -> anyhow::Result<ProbeSample> {
    let reachable: bool = row.try_get("reachable")?;
    let latency_ms: Option<f64> = row.try_get("latency_ms")?;
    let packets_sent: i64 = row.try_get("packets_sent")?;
    let packets_received: i64 = row.try_get("packets_received")?;
    Ok(ProbeSample {
        timestamp: row.try_get("created_at")?,
        target_address: row.try_get("target_address")?,
        target_name: row.try_get("target_name")?,
        reachable,
        latency_ms: if reachable { latency_ms } else { None },
        packet_loss_pct: row.try_get("packet_loss_pct")?,
        packets_sent: u32::try_from(packets_sent).unwrap_or(0),
        packets_received: u32::try_from(packets_received).unwrap_or(0),
        error: row.try_get("error")?,
    })
}
