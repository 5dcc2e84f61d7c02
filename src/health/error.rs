//! Error types for probe construction.

use crate::model::ResourceId;
use thiserror::Error;

/// Errors a [`ProbeFactory`](super::ProbeFactory) can return instead of a probe.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The resource has no endpoint for the probe to bind to.
    #[error("Resource {0} has no endpoint to probe")]
    MissingEndpoint(ResourceId),

    /// The endpoint could not be turned into a probe target.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("{0}")]
    Custom(String),
}

impl From<String> for ProbeError {
    fn from(msg: String) -> Self {
        ProbeError::Custom(msg)
    }
}
