//! The lifecycle event stream consumed by the wait coordinator.
//!
//! The host emits one [`LifecycleEvent`] per resource state change through an
//! [`EventPublisher`]. The stream is unbounded and preserves emission order per publisher.

use crate::model::{LifecycleSnapshot, ResourceId};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// A resource changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub resource: ResourceId,
    pub snapshot: LifecycleSnapshot,
}

impl LifecycleEvent {
    pub fn new(resource: impl Into<ResourceId>, snapshot: LifecycleSnapshot) -> Self {
        Self {
            resource: resource.into(),
            snapshot,
        }
    }
}

/// Receiving half of the event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<LifecycleEvent>;

/// The event stream has no consumer anymore.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Lifecycle event stream closed")]
pub struct EventStreamClosed;

/// Producer handle for lifecycle events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: mpsc::UnboundedSender<LifecycleEvent>,
}

/// Creates a new event stream.
pub fn event_channel() -> (EventPublisher, EventReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (EventPublisher { sender }, receiver)
}

impl EventPublisher {
    pub fn publish(
        &self,
        resource: impl Into<ResourceId>,
        snapshot: LifecycleSnapshot,
    ) -> Result<(), EventStreamClosed> {
        self.send(LifecycleEvent::new(resource, snapshot))
    }

    pub fn send(&self, event: LifecycleEvent) -> Result<(), EventStreamClosed> {
        trace!(resource = %event.resource, state = %event.snapshot, "Publishing lifecycle event");
        self.sender.send(event).map_err(|_| EventStreamClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
