//! Status reporting for resources blocked on their dependencies.

use crate::events::EventPublisher;
use crate::model::{LifecycleSnapshot, ResourceId};
use async_trait::async_trait;
use tracing::{info, warn};

/// Receives the coarse "Waiting" status of a resource that has unresolved edges.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish_waiting(&self, resource: &ResourceId);
}

/// Publishing "Waiting" through the event stream makes it visible to the coordinator and to
/// any edge whose allowed states include `Waiting`.
#[async_trait]
impl StatusSink for EventPublisher {
    async fn publish_waiting(&self, resource: &ResourceId) {
        if let Err(e) = self.publish(resource, LifecycleSnapshot::waiting()) {
            warn!(resource = %resource, error = %e, "Failed to publish waiting status");
        }
    }
}

/// Logs the status and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

#[async_trait]
impl StatusSink for TracingStatusSink {
    async fn publish_waiting(&self, resource: &ResourceId) {
        info!(resource = %resource, "Waiting");
    }
}
