//! Lifecycle snapshots as reported by the host for every resource state change.

use std::fmt;

/// Well-known lifecycle state labels.
///
/// The state label is free-form; these are the values the coordinator gives meaning to.
pub mod states {
    pub const STARTING: &str = "Starting";
    pub const RUNNING: &str = "Running";
    pub const WAITING: &str = "Waiting";
    pub const FAILED_TO_START: &str = "FailedToStart";
    pub const EXITED: &str = "Exited";
}

/// Point-in-time view of a resource's lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    pub state: String,
    pub exit_code: Option<i32>,
}

impl LifecycleSnapshot {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            exit_code: None,
        }
    }

    pub fn starting() -> Self {
        Self::new(states::STARTING)
    }

    pub fn running() -> Self {
        Self::new(states::RUNNING)
    }

    pub fn waiting() -> Self {
        Self::new(states::WAITING)
    }

    pub fn failed_to_start() -> Self {
        Self::new(states::FAILED_TO_START)
    }

    /// An `Exited` snapshot carrying the process exit code.
    pub fn exited(exit_code: i32) -> Self {
        Self::new(states::EXITED).with_exit_code(exit_code)
    }

    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn is(&self, state: &str) -> bool {
        self.state == state
    }

    /// A snapshot is terminal once the resource can no longer progress: it failed to start,
    /// it exited, or the host reported an exit code. Success and failure exits alike.
    pub fn is_terminal(&self) -> bool {
        self.is(states::FAILED_TO_START) || self.is(states::EXITED) || self.exit_code.is_some()
    }
}

impl fmt::Display for LifecycleSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} (exit code {})", self.state, code),
            None => f.write_str(&self.state),
        }
    }
}
