// Retention: age-based purge of both sample streams, and the VACUUM schedule.
// Purge is shared by the scheduler (every Kth tick) and the on-demand HTTP trigger.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{PurgeCounts, now_ms};
use crate::sample_repo::SampleRepo;
use crate::scheduler::wait_for_shutdown;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub struct RetentionManager {
    repo: Arc<SampleRepo>,
    max_age_days: u32,
}

impl RetentionManager {
    pub fn new(repo: Arc<SampleRepo>, max_age_days: u32) -> Self {
        Self { repo, max_age_days }
    }

    pub fn max_age_days(&self) -> u32 {
        self.max_age_days
    }

    /// Purge with the configured horizon.
    pub async fn purge_default(&self) -> anyhow::Result<PurgeCounts> {
        self.purge(self.max_age_days).await
    }

    /// Delete every sample older than `now - max_age_days`.
    pub async fn purge(&self, max_age_days: u32) -> anyhow::Result<PurgeCounts> {
        anyhow::ensure!(max_age_days > 0, "max_age_days must be > 0");
        self.purge_before(now_ms() - max_age_days as i64 * MS_PER_DAY)
            .await
    }

    /// Delete every sample with timestamp < cutoff; samples at or after it are untouched.
    #[instrument(skip(self), fields(operation = "purge"))]
    pub async fn purge_before(&self, cutoff_ts: i64) -> anyhow::Result<PurgeCounts> {
        let counts = self.repo.delete_older_than(cutoff_ts).await?;
        if counts.total() > 0 {
            info!(
                resource_samples = counts.resource_samples,
                probe_samples = counts.probe_samples,
                "purged old samples"
            );
        }
        Ok(counts)
    }
}

/// When to VACUUM: a cron expression (local time) or a fixed interval.
#[derive(Debug, Clone)]
pub enum VacuumSchedule {
    Cron(String),
    Every(Duration),
}

/// Spawns the VACUUM task. Stops when `shutdown` flips to true.
pub fn spawn_vacuum(
    repo: Arc<SampleRepo>,
    schedule: VacuumSchedule,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(delay) = next_vacuum_delay(&schedule) else {
                return;
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = repo.vacuum().await {
                        warn!(error = %e, "vacuum failed");
                    } else {
                        info!("vacuum complete");
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::debug!("Vacuum scheduler shutting down");
                    return;
                }
            }
        }
    })
}

/// Time until the next VACUUM; `None` for an unusable cron expression.
fn next_vacuum_delay(schedule: &VacuumSchedule) -> Option<Duration> {
    match schedule {
        VacuumSchedule::Every(interval) => Some(*interval),
        VacuumSchedule::Cron(cron_str) => {
            let Ok(parsed) = cron::Schedule::from_str(cron_str) else {
                warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
                return None;
            };
            let now = chrono::Local::now();
            match parsed.after(&now).next() {
                Some(next) => Some((next - now).to_std().unwrap_or(Duration::from_secs(1))),
                None => Some(Duration::from_secs(3600)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_delay() {
        let d = next_vacuum_delay(&VacuumSchedule::Every(Duration::from_secs(90)));
        assert_eq!(d, Some(Duration::from_secs(90)));
    }

    #[test]
    fn cron_delay_is_within_a_day() {
        let d = next_vacuum_delay(&VacuumSchedule::Cron("0 0 3 * * *".into())).unwrap();
        assert!(d <= Duration::from_secs(24 * 3600));
    }

    #[test]
    fn invalid_cron_disables_vacuum() {
        assert_eq!(
            next_vacuum_delay(&VacuumSchedule::Cron("not a cron".into())),
            None
        );
    }
}
