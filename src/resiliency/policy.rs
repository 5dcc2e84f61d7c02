//! Retry strategy, timeout strategy, and the executor combining them.

use super::error::{AttemptFailure, ExecutionError};
use crate::config::DependsOnOptions;
use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shape of the delay between retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffType {
    /// Fixed base delay between attempts.
    #[serde(alias = "constant")]
    None,
    Linear,
    #[default]
    Exponential,
}

/// Decides whether a failed attempt may be retried.
pub type ShouldHandle = Arc<dyn Fn(&AttemptFailure) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct RetryStrategy {
    /// Total number of invocations, the first one included. Never less than one.
    pub max_attempts: u32,
    pub backoff: BackoffType,
    /// Base delay the backoff shape is computed from.
    pub delay: Duration,
    pub max_delay: Duration,
    /// Sample each delay uniformly between half of it and all of it.
    pub jitter: bool,
    should_handle: ShouldHandle,
}

impl RetryStrategy {
    pub fn new(
        max_attempts: u32,
        backoff: BackoffType,
        delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts,
            backoff,
            delay,
            max_delay,
            jitter: false,
            should_handle: Arc::new(|_| true),
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replaces the retryable-failure predicate. By default every failure is retried.
    pub fn with_should_handle<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AttemptFailure) -> bool + Send + Sync + 'static,
    {
        self.should_handle = Arc::new(predicate);
        self
    }

    pub fn should_handle(&self, failure: &AttemptFailure) -> bool {
        (self.should_handle)(failure)
    }

    /// Delay before retry number `retry` (1-based), capped at `max_delay`, without jitter.
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let delay = match self.backoff {
            BackoffType::None => self.delay,
            BackoffType::Linear => self.delay.saturating_mul(retry),
            BackoffType::Exponential => match 2u32.checked_pow(retry - 1) {
                Some(factor) => self.delay.saturating_mul(factor),
                None => Duration::MAX,
            },
        };
        delay.min(self.max_delay)
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = self.base_delay_for(retry);
        if self.jitter {
            jitter_between(delay / 2, delay)
        } else {
            delay
        }
    }
}

impl fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("delay", &self.delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutStrategy {
    /// Upper bound for one invocation.
    pub timeout: Duration,
}

/// Retry plus per-attempt timeout.
#[derive(Debug, Clone)]
pub struct ResiliencyPolicy {
    pub retry: RetryStrategy,
    pub timeout: TimeoutStrategy,
}

impl Default for ResiliencyPolicy {
    fn default() -> Self {
        Self::from_options(&DependsOnOptions::default())
    }
}

impl ResiliencyPolicy {
    pub fn new(retry: RetryStrategy, timeout: TimeoutStrategy) -> Self {
        Self { retry, timeout }
    }

    pub fn from_options(options: &DependsOnOptions) -> Self {
        let retry = RetryStrategy::new(
            options.retry.max_attempts,
            options.retry.backoff,
            options.retry.delay,
            options.retry.max_delay,
        )
        .with_jitter(options.retry.jitter);

        Self {
            retry,
            timeout: TimeoutStrategy {
                timeout: options.timeout.timeout,
            },
        }
    }

    /// Runs `operation` until it succeeds, the attempt budget is spent, a failure is not
    /// retryable, or `cancel` fires.
    ///
    /// Returns the number of attempts it took to succeed.
    pub async fn execute<F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<u32, ExecutionError>
    where
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), AttemptFailure>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExecutionError::Cancelled),
                result = timeout(self.timeout.timeout, operation(cancel.clone())) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AttemptFailure::TimedOut(self.timeout.timeout)),
                },
            };

            let failure = match outcome {
                Ok(()) => return Ok(attempt),
                Err(failure) => failure,
            };

            if attempt >= max_attempts {
                return Err(ExecutionError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            if !self.retry.should_handle(&failure) {
                debug!(attempt, error = %failure, "Failure is not retryable");
                return Err(ExecutionError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Attempt failed, retrying"
            );

            if sleep_with_shutdown(delay, cancel).await {
                return Err(ExecutionError::Cancelled);
            }
        }
    }
}

/// Returns `true` if `shutdown` fired before the delay elapsed.
async fn sleep_with_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = sleep(duration) => false,
    }
}

fn jitter_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let mut rng = rand::thread_rng();
    let min_secs = min.as_secs_f64();
    let span = max.as_secs_f64() - min_secs;
    // f64 rounding near Duration::MAX can land past the representable range.
    Duration::try_from_secs_f64(rng.gen::<f64>() * span + min_secs)
        .map_or(max, |sampled| sampled.clamp(min, max))
}
