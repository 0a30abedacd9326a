// SQLite time series: resource_samples and probe_samples, append-only.
// The two streams are independent tables correlated only by timestamp.

mod rows;

use crate::models::{ProbeSample, PurgeCounts, ResourceSample};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Rows deleted per statement during a purge; keeps each write lock short.
const PURGE_BATCH: i64 = 5_000;

pub struct SampleRepo {
    pool: SqlitePool,
}

impl SampleRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resource_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                cpu_usage_pct REAL NOT NULL,
                cpu_load_1 REAL NOT NULL,
                cpu_load_5 REAL NOT NULL,
                cpu_load_15 REAL NOT NULL,
                mem_usage_pct REAL NOT NULL,
                mem_used_mb INTEGER NOT NULL,
                mem_total_mb INTEGER NOT NULL,
                disk_usage_pct REAL NOT NULL,
                disk_used_gb REAL NOT NULL,
                disk_total_gb REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_resource_created_at ON resource_samples(created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS probe_samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                target_address TEXT NOT NULL,
                target_name TEXT,
                reachable INTEGER NOT NULL,
                latency_ms REAL,
                packet_loss_pct REAL NOT NULL,
                packets_sent INTEGER NOT NULL,
                packets_received INTEGER NOT NULL,
                error TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_probe_created_at ON probe_samples(created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_probe_target_created_at ON probe_samples(target_address, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, sample), fields(repo = "samples", operation = "append_resource"))]
    pub async fn append_resource(&self, sample: &ResourceSample) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resource_samples
            (created_at, cpu_usage_pct, cpu_load_1, cpu_load_5, cpu_load_15,
             mem_usage_pct, mem_used_mb, mem_total_mb,
             disk_usage_pct, disk_used_gb, disk_total_gb)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(sample.timestamp)
        .bind(sample.cpu_usage_pct)
        .bind(sample.cpu_load_1)
        .bind(sample.cpu_load_5)
        .bind(sample.cpu_load_15)
        .bind(sample.mem_usage_pct)
        .bind(sample.mem_used_mb)
        .bind(sample.mem_total_mb)
        .bind(sample.disk_usage_pct)
        .bind(sample.disk_used_gb)
        .bind(sample.disk_total_gb)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(
        skip(self, sample),
        fields(repo = "samples", operation = "append_probe", target = %sample.target_address)
    )]
    pub async fn append_probe(&self, sample: &ProbeSample) -> anyhow::Result<()> {
        // latency is only meaningful for a reply
        let latency = if sample.reachable {
            sample.latency_ms
        } else {
            None
        };
        sqlx::query(
            r#"
            INSERT INTO probe_samples
            (created_at, target_address, target_name, reachable, latency_ms,
             packet_loss_pct, packets_sent, packets_received, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(sample.timestamp)
        .bind(&sample.target_address)
        .bind(&sample.target_name)
        .bind(sample.reachable)
        .bind(latency)
        .bind(sample.packet_loss_pct)
        .bind(sample.packets_sent as i64)
        .bind(sample.packets_received as i64)
        .bind(&sample.error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Resource samples with timestamp >= since_ts. Order: ascending by timestamp.
    #[instrument(skip(self), fields(repo = "samples", operation = "query_resources_since"))]
    pub async fn query_resources_since(&self, since_ts: i64) -> anyhow::Result<Vec<ResourceSample>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM resource_samples WHERE created_at >= $1 ORDER BY created_at ASC, id ASC",
            rows::RESOURCE_COLUMNS
        ))
        .bind(since_ts)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(rows::parse_resource_row).collect()
    }

    /// Probe samples with timestamp >= since_ts, optionally for one target.
    /// Order: ascending by timestamp, then target address.
    #[instrument(skip(self), fields(repo = "samples", operation = "query_probes_since"))]
    pub async fn query_probes_since(
        &self,
        since_ts: i64,
        target_address: Option<&str>,
    ) -> anyhow::Result<Vec<ProbeSample>> {
        let rows = match target_address {
            Some(address) => {
                sqlx::query(&format!(
                    "SELECT {} FROM probe_samples WHERE created_at >= $1 AND target_address = $2
                     ORDER BY created_at ASC, target_address ASC, id ASC",
                    rows::PROBE_COLUMNS
                ))
                .bind(since_ts)
                .bind(address)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {} FROM probe_samples WHERE created_at >= $1
                     ORDER BY created_at ASC, target_address ASC, id ASC",
                    rows::PROBE_COLUMNS
                ))
                .bind(since_ts)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(rows::parse_probe_row).collect()
    }

    /// Delete samples with timestamp < cutoff_ts from both streams.
    /// Runs in batches so appends from the scheduler only wait for one batch.
    #[instrument(skip(self), fields(repo = "samples", operation = "delete_older_than"))]
    pub async fn delete_older_than(&self, cutoff_ts: i64) -> anyhow::Result<PurgeCounts> {
        let resource_samples = self.delete_batched("resource_samples", cutoff_ts).await?;
        let probe_samples = self.delete_batched("probe_samples", cutoff_ts).await?;
        Ok(PurgeCounts {
            resource_samples,
            probe_samples,
        })
    }

    async fn delete_batched(&self, table: &'static str, cutoff_ts: i64) -> anyhow::Result<u64> {
        let sql = format!(
            "DELETE FROM {table} WHERE id IN (SELECT id FROM {table} WHERE created_at < $1 LIMIT $2)"
        );
        let mut deleted = 0u64;
        loop {
            let r = sqlx::query(&sql)
                .bind(cutoff_ts)
                .bind(PURGE_BATCH)
                .execute(&self.pool)
                .await?;
            deleted += r.rows_affected();
            if r.rows_affected() < PURGE_BATCH as u64 {
                break;
            }
            tokio::task::yield_now().await;
        }
        Ok(deleted)
    }

    pub async fn latest_resource(&self) -> anyhow::Result<Option<ResourceSample>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM resource_samples ORDER BY created_at DESC, id DESC LIMIT 1",
            rows::RESOURCE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(rows::parse_resource_row).transpose()
    }

    /// Most recently written probe of every target. Order: by target address.
    pub async fn latest_probes(&self) -> anyhow::Result<Vec<ProbeSample>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM probe_samples
             WHERE id IN (SELECT MAX(id) FROM probe_samples GROUP BY target_address)
             ORDER BY target_address ASC",
            rows::PROBE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(rows::parse_probe_row).collect()
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "samples", operation = "vacuum"))]
    pub async fn vacuum(&self) -> anyhow::Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
