//! The watch loop.

use super::error::WaitError;
use crate::events::{EventReceiver, LifecycleEvent};
use crate::graph::{PendingEdge, PendingEdgeRegistry};
use crate::health::HealthCheckRunner;
use crate::model::{ConditionOutcome, LifecycleSnapshot, ResourceId};
use crate::signal::CompletionSignal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Consumes the lifecycle event stream and resolves pending edges.
///
/// # Loop
///
/// For every event the coordinator takes all edges on that target whose condition matches
/// the new snapshot, removing them from the registry in the same step. Terminal failures
/// resolve immediately; everything else gets a health-check task.
///
/// The loop ends when `shutdown` fires or the stream closes. In-flight checks observe a
/// child of `shutdown` and are awaited before [`run`](Self::run) returns. Edges that never
/// matched stay pending.
pub struct WaitCoordinator {
    registry: Arc<PendingEdgeRegistry>,
    runner: HealthCheckRunner,
    snapshots: HashMap<ResourceId, LifecycleSnapshot>,
    checks: JoinSet<()>,
}

impl WaitCoordinator {
    pub fn new(registry: Arc<PendingEdgeRegistry>, runner: HealthCheckRunner) -> Self {
        Self {
            registry,
            runner,
            snapshots: HashMap::new(),
            checks: JoinSet::new(),
        }
    }

    pub async fn run(mut self, mut events: EventReceiver, shutdown: CancellationToken) {
        info!(pending = self.registry.len(), "Wait coordinator started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    break;
                }
                Some(finished) = self.checks.join_next(), if !self.checks.is_empty() => {
                    reap(finished);
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event, &shutdown),
                    None => {
                        info!("Lifecycle event stream closed");
                        break;
                    }
                },
            }
        }

        if !self.checks.is_empty() {
            debug!(in_flight = self.checks.len(), "Waiting for health checks to finish");
        }
        while let Some(finished) = self.checks.join_next().await {
            reap(finished);
        }

        info!(pending = self.registry.len(), "Wait coordinator stopped");
    }

    fn handle_event(&mut self, event: LifecycleEvent, shutdown: &CancellationToken) {
        let LifecycleEvent { resource, snapshot } = event;

        let previous = self.snapshots.insert(resource.clone(), snapshot.clone());
        match &previous {
            Some(previous) if previous == &snapshot => {}
            Some(previous) => debug!(
                resource = %resource,
                from = %previous,
                to = %snapshot,
                "Resource state changed"
            ),
            None => debug!(resource = %resource, to = %snapshot, "Resource state changed"),
        }

        let matched = self
            .registry
            .take_matching(&resource, |edge| edge.condition.evaluate(&snapshot));

        for (pending, outcome) in matched {
            match outcome {
                ConditionOutcome::DependencyFailed => {
                    warn!(
                        resource = %pending.edge.dependent,
                        dependency = %resource,
                        state = %snapshot,
                        "Dependency failed to start"
                    );
                    pending.signal.resolve(Err(WaitError::DependencyFailedToStart {
                        resource: resource.clone(),
                    }));
                }
                ConditionOutcome::CheckHealth => self.spawn_check(pending, shutdown.child_token()),
            }
        }
    }

    fn spawn_check(&mut self, pending: PendingEdge, cancel: CancellationToken) {
        let span = info_span!(
            "health_check",
            edge = pending.id.get(),
            resource = %pending.edge.dependent,
            dependency = %pending.edge.target,
        );
        let runner = self.runner.clone();

        self.checks.spawn(
            async move {
                let guard = ResolveOnDrop(pending.signal.clone());
                let outcome = runner.run(&pending.edge.target, &cancel).await;
                pending.signal.resolve(outcome);
                drop(guard);
            }
            .instrument(span),
        );
    }
}

/// Resolves the signal as cancelled if the check task ends without resolving it (panic or
/// abort). No-op after a normal resolution.
struct ResolveOnDrop(CompletionSignal);

impl Drop for ResolveOnDrop {
    fn drop(&mut self) {
        self.0.resolve(Err(WaitError::Cancelled));
    }
}

fn reap(finished: Result<(), JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            error!(error = %e, "Health check task panicked");
        }
    }
}
