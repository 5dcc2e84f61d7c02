//! The per-dependent startup gate.

use super::error::WaitError;
use crate::graph::EdgeId;
use crate::model::ResourceId;
use crate::signal::CompletionSignal;
use crate::status::StatusSink;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// One edge as seen by the dependent: the target and the signal to await.
#[derive(Debug, Clone)]
pub struct GateEdge {
    pub id: EdgeId,
    pub target: ResourceId,
    pub signal: CompletionSignal,
}

/// Blocks a dependent until every one of its edges has resolved.
///
/// Cloning is cheap and clones share the same signals, so any number of callers may wait
/// on the same gate.
#[derive(Clone)]
pub struct StartupGate {
    resource: ResourceId,
    edges: Arc<[GateEdge]>,
    status: Arc<dyn StatusSink>,
}

impl StartupGate {
    pub fn new(resource: ResourceId, edges: Vec<GateEdge>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            resource,
            edges: edges.into(),
            status,
        }
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn edges(&self) -> &[GateEdge] {
        &self.edges
    }

    /// `true` once every edge has resolved successfully.
    pub fn is_open(&self) -> bool {
        self.edges
            .iter()
            .all(|edge| matches!(edge.signal.state(), crate::signal::SignalState::ResolvedOk))
    }

    /// Waits for every edge.
    ///
    /// Publishes a single "Waiting" status for the dependent, unless the gate is already
    /// open, then returns `Ok` once all signals resolve successfully. The first failing edge
    /// ends the wait with its error; the remaining edges are left as they are. Firing
    /// `cancel` returns [`WaitError::Cancelled`] without touching any signal.
    #[instrument(skip_all, fields(resource = %self.resource))]
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), WaitError> {
        if self.is_open() {
            return Ok(());
        }

        self.status.publish_waiting(&self.resource).await;

        let mut waits = JoinSet::new();
        for edge in self.edges.iter().cloned() {
            waits.spawn(
                async move {
                    info!(dependency = %edge.target, "Waiting for dependency");
                    let outcome = edge.signal.wait().await;
                    if outcome.is_ok() {
                        info!(dependency = %edge.target, "Waiting for dependency completed");
                    }
                    (edge.target, outcome)
                }
                .in_current_span(),
            );
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                next = waits.join_next() => match next {
                    None => return Ok(()),
                    Some(Ok((_, Ok(())))) => {}
                    Some(Ok((target, Err(e)))) => {
                        if e.is_cancelled() {
                            debug!(dependency = %target, "Dependency wait cancelled");
                        } else {
                            warn!(dependency = %target, error = %e, "Dependency wait failed");
                        }
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Dependency wait task failed");
                        return Err(WaitError::Cancelled);
                    }
                },
            }
        }
    }
}

impl fmt::Debug for StartupGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupGate")
            .field("resource", &self.resource)
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}
