//! One concurrent round of probes over a target set.
//!
//! Every target started in a round yields exactly one result, including
//! targets whose probe hangs past the deadline or whose task panics.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};

use super::{ProbeError, ProbeResult, Prober};
use crate::models::Target;

pub struct ProbeRound {
    set: JoinSet<(Target, ProbeResult)>,
    pending: HashMap<Id, Target>,
}

impl ProbeRound {
    /// Spawn one probe task per target; each is bounded by `prober.deadline()`.
    pub fn start<P: Prober>(prober: &Arc<P>, targets: Vec<Target>) -> Self {
        let mut set = JoinSet::new();
        let mut pending = HashMap::with_capacity(targets.len());
        for target in targets {
            let prober = prober.clone();
            let key = target.clone();
            let handle = set.spawn(async move {
                let result = probe_with_deadline(prober.as_ref(), &target.address).await;
                (target, result)
            });
            pending.insert(handle.id(), key);
        }
        Self { set, pending }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next result in completion order; `None` once every target has reported.
    pub async fn next(&mut self) -> Option<(Target, ProbeResult)> {
        loop {
            match self.set.join_next_with_id().await? {
                Ok((id, pair)) => {
                    self.pending.remove(&id);
                    return Some(pair);
                }
                Err(e) => {
                    let Some(target) = self.pending.remove(&e.id()) else {
                        continue;
                    };
                    tracing::warn!(
                        error = %e,
                        operation = "probe",
                        target_address = %target.address,
                        "probe task failed"
                    );
                    let failure = ProbeError::Unreachable(format!("probe task failed: {e}"));
                    return Some((target, ProbeResult::failed(0, &failure)));
                }
            }
        }
    }
}

/// One probe bounded by the prober's deadline. Every outcome becomes a result.
pub async fn probe_with_deadline<P: Prober>(prober: &P, address: &str) -> ProbeResult {
    let deadline = prober.deadline();
    match tokio::time::timeout(deadline, prober.probe(address)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e @ ProbeError::InvalidTarget(_))) => {
            tracing::warn!(error = %e, target_address = %address, "target skipped");
            ProbeResult::failed(0, &e)
        }
        Ok(Err(e)) => ProbeResult::failed(prober.packets_per_probe(), &e),
        Err(_) => ProbeResult::failed(prober.packets_per_probe(), &ProbeError::Timeout(deadline)),
    }
}
