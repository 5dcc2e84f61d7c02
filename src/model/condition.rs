//! Wait conditions and how a lifecycle snapshot is matched against them.

use super::snapshot::{states, LifecycleSnapshot};
use std::collections::BTreeSet;

/// The readiness condition an edge waits for.
///
/// Three shapes are meaningful:
/// - an explicit set of allowed states ([`WaitCondition::states`]),
/// - "wait until completed" ([`WaitCondition::completion`]),
/// - the default, "wait until Running" ([`WaitCondition::running`]).
///
/// Evaluation follows a fixed precedence, see [`WaitCondition::evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitCondition {
    states: Option<BTreeSet<String>>,
    until_completed: bool,
}

/// What the coordinator should do with an edge whose condition just matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    /// The state condition is met; run the health-check phase.
    CheckHealth,
    /// The target reached a terminal state before becoming ready.
    DependencyFailed,
}

impl WaitCondition {
    /// Wait until the target reports `Running`.
    pub fn running() -> Self {
        Self::default()
    }

    /// Wait until the target reaches any terminal state.
    pub fn completion() -> Self {
        Self {
            states: None,
            until_completed: true,
        }
    }

    /// Wait until the target reports one of `states`.
    pub fn states<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: Some(states.into_iter().map(Into::into).collect()),
            until_completed: false,
        }
    }

    pub fn allowed_states(&self) -> Option<&BTreeSet<String>> {
        self.states.as_ref()
    }

    pub fn until_completed(&self) -> bool {
        self.until_completed
    }

    pub fn is_default(&self) -> bool {
        self.states.is_none() && !self.until_completed
    }

    /// Matches a snapshot against this condition.
    ///
    /// 1. Allowed-state set containing the new state: check health.
    /// 2. Otherwise, "until completed" and the snapshot is terminal: check health, whatever
    ///    the exit code.
    /// 3. Otherwise, with no allowed-state set: `Running` checks health, a terminal snapshot
    ///    fails the dependency.
    ///
    /// `None` leaves the edge pending. An allowed-state set that never matches keeps the edge
    /// pending even after the target terminates.
    pub fn evaluate(&self, snapshot: &LifecycleSnapshot) -> Option<ConditionOutcome> {
        if let Some(states) = &self.states {
            if states.contains(snapshot.state()) {
                return Some(ConditionOutcome::CheckHealth);
            }
        }

        if self.until_completed {
            return snapshot
                .is_terminal()
                .then_some(ConditionOutcome::CheckHealth);
        }

        if self.states.is_none() {
            if snapshot.is(states::RUNNING) {
                return Some(ConditionOutcome::CheckHealth);
            }
            if snapshot.is_terminal() {
                return Some(ConditionOutcome::DependencyFailed);
            }
        }

        None
    }
}
