//! Executes the health check of a dependency edge's target.

use super::probe::HealthProbe;
use crate::coordinator::WaitError;
use crate::model::{ResourceId, ResourceModel};
use crate::resiliency::{AttemptFailure, ExecutionError, ResiliencyPolicy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs health checks for targets in one resource model.
///
/// The descriptor is looked up on the target and then up its parent chain; the probe is
/// built against the resource that owns the descriptor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HealthCheckRunner {
    model: Arc<ResourceModel>,
    policy: Arc<ResiliencyPolicy>,
}

impl HealthCheckRunner {
    pub fn new(model: Arc<ResourceModel>, policy: Arc<ResiliencyPolicy>) -> Self {
        Self { model, policy }
    }

    /// Resolves to `Ok` once the target is healthy or has nothing to check.
    ///
    /// A probe construction error is reported immediately and never retried.
    #[instrument(skip_all, fields(resource = %target))]
    pub async fn run(
        &self,
        target: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError> {
        let Some((owner, descriptor)) = self.model.find_health_check(target) else {
            debug!("No health check registered");
            return Ok(());
        };

        let created = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(owner = %owner.id(), "Health check cancelled during construction");
                return Err(WaitError::Cancelled);
            }
            created = descriptor.factory().create(owner) => created,
        };

        let probe = match created {
            Ok(Some(probe)) => probe,
            Ok(None) => {
                debug!(owner = %owner.id(), "Health check factory produced no probe");
                return Ok(());
            }
            Err(e) => {
                warn!(owner = %owner.id(), error = %e, "Failed to construct health check");
                return Err(WaitError::HealthCheckConstructionFailed {
                    resource: target.clone(),
                    reason: e.to_string(),
                });
            }
        };

        debug!(owner = %owner.id(), "Running health check");
        let probe: Arc<dyn HealthProbe> = Arc::from(probe);
        let result = self
            .policy
            .execute(cancel, |attempt_cancel| {
                let probe = probe.clone();
                async move {
                    let result = probe.check(&attempt_cancel).await;
                    if result.is_healthy() {
                        Ok(())
                    } else {
                        Err(AttemptFailure::Failed(result.failure_reason()))
                    }
                }
            })
            .await;

        match result {
            Ok(attempts) => {
                info!(attempts, "Health check passed");
                Ok(())
            }
            Err(ExecutionError::Exhausted { attempts, last }) => {
                warn!(attempts, error = %last, "Health check failed");
                Err(WaitError::HealthCheckFailed {
                    resource: target.clone(),
                    attempts,
                    reason: last.to_string(),
                })
            }
            Err(ExecutionError::Cancelled) => {
                debug!("Health check cancelled");
                Err(WaitError::Cancelled)
            }
        }
    }
}
