//! # Mock Probes
//!
//! Scripted probes and factories for testing health-check handling without real
//! endpoints.
//!
//! Queue results with [`MockProbe::expect_check`]; each probe invocation consumes one.
//! Wrap the probe in a [`MockProbeFactory`] and attach it to a resource with
//! [`MockProbeFactory::descriptor`].
//!
//! ```ignore
//! let probe = MockProbe::new();
//! probe.expect_checks(2).return_unhealthy("starting");
//! probe.expect_check().return_healthy();
//!
//! let factory = MockProbeFactory::returning(probe.clone());
//! let db = Resource::new("db").with_health_check(factory.descriptor());
//! // ... run the coordinator ...
//! probe.verify();
//! ```

use super::error::ProbeError;
use super::probe::{HealthCheckDescriptor, HealthCheckResult, HealthProbe, ProbeFactory};
use crate::model::{Resource, ResourceId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

enum Expectation {
    Respond(HealthCheckResult),
    /// Never completes on its own; ends only when the attempt is cancelled or times out.
    Hang,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    fallback: Option<HealthCheckResult>,
    calls: u32,
}

/// A probe that replays queued results in order.
///
/// Clones share the same queue and call counter.
#[derive(Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    /// Creates a probe with no expectations. Checking it without any panics.
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe that returns `result` on every call once its queue is empty.
    pub fn always(result: HealthCheckResult) -> Self {
        let probe = Self::new();
        probe.lock().fallback = Some(result);
        probe
    }

    pub fn always_healthy() -> Self {
        Self::always(HealthCheckResult::healthy())
    }

    /// Expects one more check.
    pub fn expect_check(&self) -> CheckExpectationBuilder {
        self.expect_checks(1)
    }

    /// Expects `times` more checks, all answered the same way.
    pub fn expect_checks(&self, times: usize) -> CheckExpectationBuilder {
        CheckExpectationBuilder {
            times,
            state: self.state.clone(),
        }
    }

    /// Number of times the probe has been invoked.
    pub fn calls(&self) -> u32 {
        self.lock().calls
    }

    /// Panics if queued expectations were not consumed.
    pub fn verify(&self) {
        let remaining = self.lock().expectations.len();
        if remaining > 0 {
            panic!("Not all health check expectations were met. {remaining} remaining");
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    async fn check(&self, cancel: &CancellationToken) -> HealthCheckResult {
        let next = {
            let mut state = self.lock();
            state.calls += 1;
            match state.expectations.pop_front() {
                Some(expectation) => expectation,
                None => match &state.fallback {
                    Some(result) => Expectation::Respond(result.clone()),
                    None => panic!("Unexpected health check (call {})", state.calls),
                },
            }
        };

        match next {
            Expectation::Respond(result) => result,
            Expectation::Hang => {
                cancel.cancelled().await;
                HealthCheckResult::unhealthy("check cancelled")
            }
        }
    }
}

/// Builder returned by [`MockProbe::expect_check`].
pub struct CheckExpectationBuilder {
    times: usize,
    state: Arc<Mutex<MockState>>,
}

impl CheckExpectationBuilder {
    pub fn return_healthy(self) {
        self.respond(HealthCheckResult::healthy());
    }

    pub fn return_unhealthy(self, description: &str) {
        self.respond(HealthCheckResult::unhealthy(description));
    }

    pub fn return_degraded(self, description: &str) {
        self.respond(HealthCheckResult::degraded(description));
    }

    /// A `Healthy` status that still carries an error, which counts as a failure.
    pub fn return_error(self, error: &str) {
        self.respond(HealthCheckResult::healthy().with_error(error));
    }

    pub fn respond(self, result: HealthCheckResult) {
        self.push(|| Expectation::Respond(result.clone()));
    }

    /// The check never returns by itself.
    pub fn hang(self) {
        self.push(|| Expectation::Hang);
    }

    fn push(self, make: impl Fn() -> Expectation) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for _ in 0..self.times {
            state.expectations.push_back(make());
        }
    }
}

#[derive(Clone)]
enum FactoryBehavior {
    Probe(MockProbe),
    Fail(String),
    NoProbe,
    Hang,
}

/// A factory with a fixed answer that records which resources it was asked about.
#[derive(Clone)]
pub struct MockProbeFactory {
    behavior: FactoryBehavior,
    created_for: Arc<Mutex<Vec<ResourceId>>>,
}

impl MockProbeFactory {
    /// Hands out clones of `probe`.
    pub fn returning(probe: MockProbe) -> Self {
        Self::with_behavior(FactoryBehavior::Probe(probe))
    }

    /// Fails construction with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_behavior(FactoryBehavior::Fail(reason.into()))
    }

    /// Reports that the resource has nothing to check.
    pub fn none() -> Self {
        Self::with_behavior(FactoryBehavior::NoProbe)
    }

    /// Never finishes constructing. The call is still recorded.
    pub fn hanging() -> Self {
        Self::with_behavior(FactoryBehavior::Hang)
    }

    fn with_behavior(behavior: FactoryBehavior) -> Self {
        Self {
            behavior,
            created_for: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A descriptor backed by this factory. Clones share the construction log.
    pub fn descriptor(&self) -> HealthCheckDescriptor {
        HealthCheckDescriptor::new(self.clone())
    }

    pub fn constructions(&self) -> usize {
        self.log().len()
    }

    /// Resources passed to [`ProbeFactory::create`], in call order.
    pub fn created_for(&self) -> Vec<ResourceId> {
        self.log().clone()
    }

    fn log(&self) -> MutexGuard<'_, Vec<ResourceId>> {
        self.created_for.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ProbeFactory for MockProbeFactory {
    async fn create(
        &self,
        resource: &Resource,
    ) -> Result<Option<Box<dyn HealthProbe>>, ProbeError> {
        self.log().push(resource.id().clone());
        match &self.behavior {
            FactoryBehavior::Probe(probe) => Ok(Some(Box::new(probe.clone()))),
            FactoryBehavior::Fail(reason) => Err(ProbeError::Custom(reason.clone())),
            FactoryBehavior::NoProbe => Ok(None),
            FactoryBehavior::Hang => std::future::pending().await,
        }
    }
}
