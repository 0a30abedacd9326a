//! On-demand health report: host identity, a fresh resource sample, primary
//! interface counters and a live probe of every enabled target.
//!
//! Nothing here touches the sample store; the scheduler remains the only writer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::models::{HealthReport, ProbeSample, now_ms, round2};
use crate::probe::{ProbeRound, Prober};
use crate::resource_repo::ResourceRepo;
use crate::target_repo::TargetRepo;

/// Object-safe face of [`HealthChecker`] so the router state stays non-generic.
pub trait HealthCheck: Send + Sync {
    fn run(&self) -> Pin<Box<dyn Future<Output = HealthReport> + Send + '_>>;
}

pub struct HealthChecker<P: Prober> {
    resource_repo: Arc<ResourceRepo>,
    target_repo: Arc<TargetRepo>,
    prober: Arc<P>,
}

impl<P: Prober> HealthChecker<P> {
    pub fn new(resource_repo: Arc<ResourceRepo>, target_repo: Arc<TargetRepo>, prober: Arc<P>) -> Self {
        Self {
            resource_repo,
            target_repo,
            prober,
        }
    }

    pub async fn check(&self) -> HealthReport {
        let started = Instant::now();
        let generated_at = now_ms();

        let (resources, host_info, network, targets) = tokio::join!(
            self.resource_repo.sample(generated_at),
            self.resource_repo.host_info(),
            self.resource_repo.network_stats(),
            self.probe_targets(generated_at),
        );

        let mut errors = Vec::new();
        let resources = keep(resources, "resources", &mut errors);
        let host_info = keep(host_info, "host info", &mut errors);
        let network = keep(network, "network", &mut errors);

        let report = HealthReport {
            generated_at,
            execution_time_ms: round2(started.elapsed().as_secs_f64() * 1000.0),
            host_info,
            resources,
            network,
            targets,
            errors,
        };
        tracing::info!(
            targets = report.targets.len(),
            online = report.targets.iter().filter(|s| s.reachable).count(),
            errors = report.errors.len(),
            execution_time_ms = report.execution_time_ms,
            "health check complete"
        );
        report
    }

    async fn probe_targets(&self, timestamp: i64) -> Vec<ProbeSample> {
        let mut round = ProbeRound::start(&self.prober, self.target_repo.enabled_targets());
        let mut samples = Vec::with_capacity(round.len());
        while let Some((target, result)) = round.next().await {
            samples.push(ProbeSample::from_result(timestamp, &target, result));
        }
        samples.sort_by(|a, b| a.target_address.cmp(&b.target_address));
        samples
    }
}

impl<P: Prober> HealthCheck for HealthChecker<P> {
    fn run(&self) -> Pin<Box<dyn Future<Output = HealthReport> + Send + '_>> {
        Box::pin(self.check())
    }
}

fn keep<T>(result: anyhow::Result<T>, section: &str, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, section, "health check section unavailable");
            errors.push(format!("{section}: {e}"));
            None
        }
    }
}
