//! Error types surfaced by a dependent's startup gate.

use crate::model::ResourceId;
use thiserror::Error;

/// Why an edge resolved to failure.
///
/// Cloned into every waiter of a completion signal, so the payloads are owned strings
/// rather than boxed sources.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitError {
    /// The target reached a terminal state before satisfying a default-condition edge.
    #[error("Dependency {resource} failed to start")]
    DependencyFailedToStart { resource: ResourceId },

    /// The probe never reported healthy within the resiliency budget.
    #[error("Health check for {resource} failed after {attempts} attempt(s): {reason}")]
    HealthCheckFailed {
        resource: ResourceId,
        attempts: u32,
        reason: String,
    },

    /// The probe factory returned an error.
    #[error("Failed to construct a health check for {resource}: {reason}")]
    HealthCheckConstructionFailed { resource: ResourceId, reason: String },

    /// Shutdown (or the caller) cancelled the wait before it resolved.
    #[error("Wait cancelled")]
    Cancelled,
}

impl WaitError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }
}
