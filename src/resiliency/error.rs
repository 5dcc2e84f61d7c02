//! Failure types produced while executing under a resiliency policy.

use std::time::Duration;
use thiserror::Error;

/// Why a single attempt failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    /// The operation completed and reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The operation did not complete within the per-attempt timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Why execution under the policy gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// Attempt budget exhausted, or the last failure was not retryable.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: AttemptFailure },

    #[error("execution cancelled")]
    Cancelled,
}
