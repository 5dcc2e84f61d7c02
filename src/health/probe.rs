//! Probe and factory traits, probe results, and the descriptor attached to resources.

use super::error::ProbeError;
use crate::model::Resource;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Degraded => "Degraded",
            HealthStatus::Unhealthy => "Unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe invocation.
///
/// Only a `Healthy` status without an error counts as passing. `Degraded` is a failure as
/// far as startup ordering is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub description: Option<String>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
            error: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
            error: None,
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy && self.error.is_none()
    }

    /// Human-readable reason for a failed check.
    pub fn failure_reason(&self) -> String {
        match (&self.error, &self.description) {
            (Some(error), _) => error.clone(),
            (None, Some(description)) => format!("{}: {}", self.status, description),
            (None, None) => format!("Health check reported {}", self.status),
        }
    }
}

/// A readiness check bound to one resource's connection info.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Runs the check once. Long-running probes should return early when `cancel` fires.
    async fn check(&self, cancel: &CancellationToken) -> HealthCheckResult;
}

/// Builds the probe for a resource.
///
/// `Ok(None)` means "nothing to check" and lets the edge resolve immediately. An error is a
/// construction failure and is not retried.
#[async_trait]
pub trait ProbeFactory: Send + Sync {
    async fn create(&self, resource: &Resource) -> Result<Option<Box<dyn HealthProbe>>, ProbeError>;
}

/// Health check attached to a resource. Children without their own descriptor inherit the
/// nearest ancestor's.
#[derive(Clone)]
pub struct HealthCheckDescriptor {
    factory: Arc<dyn ProbeFactory>,
}

impl HealthCheckDescriptor {
    pub fn new(factory: impl ProbeFactory + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// A descriptor whose probe is built from the resource's endpoint.
    ///
    /// A resource without an endpoint fails construction with
    /// [`ProbeError::MissingEndpoint`].
    pub fn for_endpoint<F>(build: F) -> Self
    where
        F: Fn(&str) -> Result<Box<dyn HealthProbe>, ProbeError> + Send + Sync + 'static,
    {
        Self::new(EndpointProbeFactory { build })
    }

    /// TCP reachability check against the resource's endpoint.
    pub fn tcp() -> Self {
        Self::for_endpoint(|endpoint| {
            let probe = super::TcpConnectProbe::from_endpoint(endpoint)?;
            Ok(Box::new(probe) as Box<dyn HealthProbe>)
        })
    }

    pub fn factory(&self) -> &dyn ProbeFactory {
        self.factory.as_ref()
    }
}

impl fmt::Debug for HealthCheckDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheckDescriptor").finish_non_exhaustive()
    }
}

struct EndpointProbeFactory<F> {
    build: F,
}

#[async_trait]
impl<F> ProbeFactory for EndpointProbeFactory<F>
where
    F: Fn(&str) -> Result<Box<dyn HealthProbe>, ProbeError> + Send + Sync,
{
    async fn create(
        &self,
        resource: &Resource,
    ) -> Result<Option<Box<dyn HealthProbe>>, ProbeError> {
        let endpoint = resource
            .endpoint()
            .ok_or_else(|| ProbeError::MissingEndpoint(resource.id().clone()))?;
        (self.build)(endpoint).map(Some)
    }
}
