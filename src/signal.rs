//! One-shot completion signals attached to dependency edges.

use crate::coordinator::WaitError;
use std::sync::Arc;
use tokio::sync::watch;

/// State of a [`CompletionSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalState {
    Pending,
    ResolvedOk,
    ResolvedErr(WaitError),
}

impl SignalState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SignalState::Pending)
    }

    fn to_result(&self) -> Option<Result<(), WaitError>> {
        match self {
            SignalState::Pending => None,
            SignalState::ResolvedOk => Some(Ok(())),
            SignalState::ResolvedErr(err) => Some(Err(err.clone())),
        }
    }
}

/// A one-shot result cell: `Pending` moves to a resolved state exactly once.
///
/// Clones share the same cell. The first call to [`resolve`](Self::resolve) wins; every
/// later call is a no-op and returns `false`. The check-and-set happens inside the watch
/// channel's lock, so two concurrent resolvers cannot both succeed.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    sender: Arc<watch::Sender<SignalState>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(SignalState::Pending);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Resolves the signal. Returns `true` if this call performed the transition.
    pub fn resolve(&self, outcome: Result<(), WaitError>) -> bool {
        let next = match outcome {
            Ok(()) => SignalState::ResolvedOk,
            Err(err) => SignalState::ResolvedErr(err),
        };

        self.sender.send_if_modified(|state| {
            if state.is_pending() {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub fn state(&self) -> SignalState {
        self.sender.borrow().clone()
    }

    pub fn is_resolved(&self) -> bool {
        !self.sender.borrow().is_pending()
    }

    /// Suspends until the signal resolves and returns its outcome.
    pub async fn wait(&self) -> Result<(), WaitError> {
        let mut receiver = self.sender.subscribe();
        let state = receiver
            .wait_for(|state| !state.is_pending())
            .await
            .map_err(|_| WaitError::Cancelled)?;

        let outcome = state.to_result();
        outcome.unwrap_or(Err(WaitError::Cancelled))
    }
}
