// Daemon loop: aligned probe ticks and resource ticks, persisted as they complete.
// Each loop runs on its own boundary; periodic purge and the status line ride the probe loop.

pub mod clock;

pub use clock::{NextTick, TickClock, next_aligned, plan_next};

use crate::models::ProbeSample;
use crate::probe::{ProbeRound, Prober};
use crate::resource_repo::ResourceRepo;
use crate::retention::RetentionManager;
use crate::sample_repo::SampleRepo;
use crate::target_repo::TargetRepo;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Probe ticks between two status lines (about a minute at 5s).
pub const STATUS_EVERY_TICKS: u64 = 12;

/// Repos and the prober the scheduler drives.
pub struct SchedulerDeps<P: Prober> {
    pub sample_repo: Arc<SampleRepo>,
    pub target_repo: Arc<TargetRepo>,
    pub resource_repo: Arc<ResourceRepo>,
    pub retention: Arc<RetentionManager>,
    pub prober: Arc<P>,
}

/// Scheduler cadence.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub probe_interval: Duration,
    pub resource_interval: Duration,
    /// Purge once every N probe ticks.
    pub retention_every_ticks: u64,
}

/// Outcome of one probe tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub probed: usize,
    pub reachable: usize,
    pub write_failures: usize,
}

pub struct Scheduler<P: Prober> {
    sample_repo: Arc<SampleRepo>,
    target_repo: Arc<TargetRepo>,
    resource_repo: Arc<ResourceRepo>,
    retention: Arc<RetentionManager>,
    prober: Arc<P>,
    config: SchedulerConfig,
}

impl<P: Prober> Scheduler<P> {
    pub fn new(deps: SchedulerDeps<P>, config: SchedulerConfig) -> Self {
        let SchedulerDeps {
            sample_repo,
            target_repo,
            resource_repo,
            retention,
            prober,
        } = deps;
        Self {
            sample_repo,
            target_repo,
            resource_repo,
            retention,
            prober,
            config: SchedulerConfig {
                retention_every_ticks: config.retention_every_ticks.max(1),
                ..config
            },
        }
    }

    /// Probe every enabled target concurrently and store one sample per target,
    /// stamped with `timestamp`. Results are written as they complete.
    pub async fn run_probe_tick(&self, timestamp: i64) -> TickReport {
        let targets = self.target_repo.enabled_targets();
        let mut report = TickReport::default();
        let mut round = ProbeRound::start(&self.prober, targets);

        while let Some((target, result)) = round.next().await {
            report.probed += 1;
            if result.reachable {
                report.reachable += 1;
            }
            let sample = ProbeSample::from_result(timestamp, &target, result);
            if let Err(e) = self.sample_repo.append_probe(&sample).await {
                report.write_failures += 1;
                tracing::warn!(
                    error = %e,
                    operation = "append_probe",
                    target_address = %sample.target_address,
                    "probe sample not stored"
                );
            }
        }
        report
    }

    /// Take and store one resource sample. Returns false when sampling or the write failed.
    pub async fn run_resource_tick(&self, timestamp: i64) -> bool {
        let sample = match self.resource_repo.sample(timestamp).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, operation = "sample_resources", "resource tick skipped");
                return false;
            }
        };
        if let Err(e) = self.sample_repo.append_resource(&sample).await {
            tracing::warn!(error = %e, operation = "append_resource", "resource sample not stored");
            return false;
        }
        true
    }

    /// Spawns both loops. The returned handle completes once both have stopped.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        let probes = tokio::spawn(self.clone().probe_loop(shutdown.clone()));
        let resources = tokio::spawn(self.resource_loop(shutdown));
        tokio::spawn(async move {
            if let Err(e) = probes.await {
                tracing::warn!(error = %e, "probe loop ended abnormally");
            }
            if let Err(e) = resources.await {
                tracing::warn!(error = %e, "resource loop ended abnormally");
            }
        })
    }

    async fn probe_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let clock = TickClock::new(self.config.probe_interval);
        let mut scheduled = clock.first_tick();
        let mut iteration: u64 = 0;
        tracing::info!(
            interval_ms = clock.interval_ms(),
            first_tick = scheduled,
            "probe loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(clock.deadline(scheduled)) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
            iteration += 1;

            let report = self.run_probe_tick(scheduled).await;
            tracing::debug!(
                tick = scheduled,
                probed = report.probed,
                reachable = report.reachable,
                write_failures = report.write_failures,
                "probe tick complete"
            );

            if iteration % self.config.retention_every_ticks == 0
                && let Err(e) = self.retention.purge_default().await
            {
                tracing::warn!(error = %e, operation = "purge", "scheduled purge failed");
            }
            if iteration % STATUS_EVERY_TICKS == 0 {
                tracing::info!(
                    online = report.reachable,
                    total = report.probed,
                    iteration,
                    "{}/{} targets online",
                    report.reachable,
                    report.probed
                );
            }

            let next = clock.advance(scheduled);
            log_overrun("probe", scheduled, next);
            scheduled = next.at;
        }
        tracing::debug!("Probe loop shutting down");
    }

    async fn resource_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let clock = TickClock::new(self.config.resource_interval);
        let mut scheduled = clock.first_tick();
        tracing::info!(
            interval_ms = clock.interval_ms(),
            first_tick = scheduled,
            "resource loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(clock.deadline(scheduled)) => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
            self.run_resource_tick(scheduled).await;

            let next = clock.advance(scheduled);
            log_overrun("resource", scheduled, next);
            scheduled = next.at;
        }
        tracing::debug!("Resource loop shutting down");
    }
}

/// Resolves once `rx` holds `true` or its sender is gone.
pub async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

fn log_overrun(loop_name: &str, scheduled: i64, next: NextTick) {
    if next.overran {
        tracing::warn!(
            loop_name,
            tick = scheduled,
            missed_ticks = next.skipped,
            "tick overran its interval"
        );
    }
}
