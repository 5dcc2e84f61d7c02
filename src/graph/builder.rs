//! Turns wait declarations into pending edges and startup gates.

use super::registry::{DependencyEdge, PendingEdgeRegistry};
use crate::coordinator::{GateEdge, StartupGate};
use crate::model::{Resource, ResourceId, ResourceModel};
use crate::status::StatusSink;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registers the edges of each dependent exactly once.
///
/// Asking for the same dependent's gate again returns the gate built the first time, so the
/// registry never holds duplicate edges for one declaration.
pub struct DependencyGraphBuilder {
    registry: Arc<PendingEdgeRegistry>,
    status: Arc<dyn StatusSink>,
    gates: HashMap<ResourceId, StartupGate>,
}

impl DependencyGraphBuilder {
    pub fn new(registry: Arc<PendingEdgeRegistry>, status: Arc<dyn StatusSink>) -> Self {
        Self {
            registry,
            status,
            gates: HashMap::new(),
        }
    }

    /// Registers every resource in `model`. Returns the number of edges created.
    pub fn build(&mut self, model: &ResourceModel) -> usize {
        let before = self.registry.len();
        for resource in model.resources() {
            for wait in resource.waits() {
                if model.get(&wait.target).is_none() {
                    warn!(
                        resource = %resource.id(),
                        dependency = %wait.target,
                        "Waiting on a resource that is not in the model"
                    );
                }
            }
            self.register(resource);
        }

        let created = self.registry.len().saturating_sub(before);
        info!(edges = created, gates = self.gates.len(), "Dependency graph built");
        created
    }

    /// Registers `resource`'s declarations and returns its gate.
    ///
    /// `None` when the resource waits on nothing but itself, or on nothing at all.
    pub fn register(&mut self, resource: &Resource) -> Option<StartupGate> {
        if let Some(gate) = self.gates.get(resource.id()) {
            return Some(gate.clone());
        }

        let edges: Vec<GateEdge> = resource
            .waits()
            .iter()
            .filter_map(|wait| {
                self.registry.insert(DependencyEdge {
                    dependent: resource.id().clone(),
                    target: wait.target.clone(),
                    condition: wait.condition.clone(),
                })
            })
            .map(|pending| {
                debug!(
                    edge = %pending.id,
                    resource = %pending.edge.dependent,
                    dependency = %pending.edge.target,
                    "Registered dependency edge"
                );
                GateEdge {
                    id: pending.id,
                    target: pending.edge.target,
                    signal: pending.signal,
                }
            })
            .collect();

        if edges.is_empty() {
            return None;
        }

        let gate = StartupGate::new(resource.id().clone(), edges, self.status.clone());
        self.gates.insert(resource.id().clone(), gate.clone());
        Some(gate)
    }

    pub fn gate(&self, resource: &ResourceId) -> Option<&StartupGate> {
        self.gates.get(resource)
    }

    pub fn into_gates(self) -> HashMap<ResourceId, StartupGate> {
        self.gates
    }
}
