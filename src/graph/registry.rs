//! Registry of unresolved dependency edges, grouped by the resource they wait on.

use crate::model::{ResourceId, WaitCondition};
use crate::signal::CompletionSignal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Stable integer identity of an edge within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge-{}", self.0)
    }
}

/// "`dependent` waits on `target` under `condition`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub dependent: ResourceId,
    pub target: ResourceId,
    pub condition: WaitCondition,
}

/// An edge still waiting for its condition, with the signal it will resolve.
#[derive(Debug, Clone)]
pub struct PendingEdge {
    pub id: EdgeId,
    pub edge: DependencyEdge,
    pub signal: CompletionSignal,
}

/// Unresolved edges keyed by target.
///
/// Removal goes through [`take_matching`](Self::take_matching), which selects and removes
/// under a single lock: an edge handed out once is gone, so it cannot be resolved twice no
/// matter how quickly events for its target arrive.
#[derive(Default)]
pub struct PendingEdgeRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    by_target: HashMap<ResourceId, BTreeMap<EdgeId, PendingEdge>>,
}

impl PendingEdgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an edge and returns it with its fresh signal.
    ///
    /// Returns `None` for an edge whose dependent is its own target; such edges are never
    /// created.
    pub fn insert(&self, edge: DependencyEdge) -> Option<PendingEdge> {
        if edge.dependent == edge.target {
            debug!(resource = %edge.dependent, "Ignoring dependency on itself");
            return None;
        }

        let mut inner = self.lock();
        inner.next_id += 1;
        let pending = PendingEdge {
            id: EdgeId(inner.next_id),
            edge,
            signal: CompletionSignal::new(),
        };

        inner
            .by_target
            .entry(pending.edge.target.clone())
            .or_default()
            .insert(pending.id, pending.clone());
        Some(pending)
    }

    /// Removes and returns every edge on `target` for which `select` returns `Some`,
    /// paired with that value. Edges are visited in registration order.
    pub fn take_matching<T, F>(&self, target: &ResourceId, mut select: F) -> Vec<(PendingEdge, T)>
    where
        F: FnMut(&DependencyEdge) -> Option<T>,
    {
        let mut inner = self.lock();
        let Some(edges) = inner.by_target.get_mut(target) else {
            return Vec::new();
        };

        let selected: Vec<(EdgeId, T)> = edges
            .iter()
            .filter_map(|(id, pending)| select(&pending.edge).map(|value| (*id, value)))
            .collect();

        let taken = selected
            .into_iter()
            .filter_map(|(id, value)| edges.remove(&id).map(|pending| (pending, value)))
            .collect();

        if edges.is_empty() {
            inner.by_target.remove(target);
        }
        taken
    }

    /// Snapshot of the edges still waiting on `target`.
    pub fn pending_for(&self, target: &ResourceId) -> Vec<PendingEdge> {
        self.lock()
            .by_target
            .get(target)
            .map(|edges| edges.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Targets that still have at least one pending edge.
    pub fn targets(&self) -> Vec<ResourceId> {
        let mut targets: Vec<_> = self.lock().by_target.keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.lock().by_target.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_target.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PendingEdgeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingEdgeRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
