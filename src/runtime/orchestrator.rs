use crate::config::DependsOnOptions;
use crate::coordinator::{StartupGate, WaitCoordinator, WaitError};
use crate::events::{event_channel, EventPublisher};
use crate::graph::{DependencyGraphBuilder, PendingEdgeRegistry};
use crate::health::HealthCheckRunner;
use crate::model::{ResourceId, ResourceModel};
use crate::resiliency::ResiliencyPolicy;
use crate::status::StatusSink;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// How the host is running the application model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Resources are started; dependents wait on their dependencies.
    #[default]
    Run,
    /// The model is only being described (e.g. emitted as a manifest). Nothing starts, so
    /// no edges are created and every gate is open.
    Publish,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Wait coordinator task failed: {0}")]
    CoordinatorFailed(String),
}

/// Wires one run of dependency-startup ordering.
///
/// `Orchestrator` is responsible for:
/// - **Graph construction**: one pending edge per wait declaration, before anything starts
/// - **Coordinator lifecycle**: spawning the watch loop and stopping it on shutdown
/// - **Gate lookup**: handing each dependent its [`StartupGate`]
///
/// # Example
///
/// ```ignore
/// let model = ResourceModel::new()
///     .with_resource(
///         Resource::new("db")
///             .with_endpoint("localhost:5432")
///             .with_health_check(HealthCheckDescriptor::tcp()),
///     )
///     .with_resource(Resource::new("api").wait_for("db"));
///
/// let orchestrator = Orchestrator::builder(model).options(&DependsOnOptions::load()?).start();
/// let events = orchestrator.publisher();
///
/// // Host: report lifecycle changes as they happen
/// events.publish("db", LifecycleSnapshot::running())?;
///
/// // Before starting "api"
/// orchestrator.wait_for_dependencies(&"api".into(), &cancel).await?;
///
/// orchestrator.shutdown().await?;
/// ```
pub struct Orchestrator {
    mode: ExecutionMode,
    publisher: EventPublisher,
    registry: Arc<PendingEdgeRegistry>,
    gates: HashMap<ResourceId, StartupGate>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn builder(model: ResourceModel) -> OrchestratorBuilder {
        OrchestratorBuilder {
            model,
            policy: ResiliencyPolicy::default(),
            mode: ExecutionMode::Run,
            status: None,
        }
    }

    /// Starts a run with the policy described by `options`.
    pub fn start(model: ResourceModel, options: &DependsOnOptions) -> Self {
        Self::builder(model).options(options).start()
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Handle for reporting lifecycle events to the coordinator.
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// The gate for `resource`, if it has any edges.
    pub fn gate(&self, resource: &ResourceId) -> Option<StartupGate> {
        self.gates.get(resource).cloned()
    }

    /// Blocks until `resource` may start.
    ///
    /// Resources without edges, and every resource in publish mode, return immediately.
    pub async fn wait_for_dependencies(
        &self,
        resource: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError> {
        match self.gates.get(resource) {
            Some(gate) => gate.wait(cancel).await,
            None => Ok(()),
        }
    }

    pub fn pending_edges(&self) -> usize {
        self.registry.len()
    }

    /// Stops the coordinator and waits for in-flight health checks to wind down.
    pub async fn shutdown(mut self) -> Result<(), OrchestratorError> {
        info!("Shutting down dependency coordinator...");
        self.shutdown.cancel();

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Wait coordinator task failed: {:?}", e);
                return Err(OrchestratorError::CoordinatorFailed(e.to_string()));
            }
        }

        info!(pending = self.registry.len(), "Dependency coordinator shutdown complete.");
        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Configures an [`Orchestrator`] before it starts.
pub struct OrchestratorBuilder {
    model: ResourceModel,
    policy: ResiliencyPolicy,
    mode: ExecutionMode,
    status: Option<Arc<dyn StatusSink>>,
}

impl OrchestratorBuilder {
    pub fn options(self, options: &DependsOnOptions) -> Self {
        self.policy(ResiliencyPolicy::from_options(options))
    }

    pub fn policy(mut self, policy: ResiliencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Where "Waiting" statuses go. Defaults to the orchestrator's own event stream.
    pub fn status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    /// Builds the dependency graph and spawns the coordinator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> Orchestrator {
        let (publisher, events) = event_channel();
        let registry = Arc::new(PendingEdgeRegistry::new());
        let model = Arc::new(self.model);

        let gates = match self.mode {
            ExecutionMode::Run => {
                let status = self
                    .status
                    .unwrap_or_else(|| Arc::new(publisher.clone()) as Arc<dyn StatusSink>);
                let mut builder = DependencyGraphBuilder::new(registry.clone(), status);
                builder.build(&model);
                builder.into_gates()
            }
            ExecutionMode::Publish => {
                info!("Publish mode, dependencies are not awaited");
                HashMap::new()
            }
        };

        let runner = HealthCheckRunner::new(model, Arc::new(self.policy));
        let shutdown = CancellationToken::new();
        let coordinator = WaitCoordinator::new(registry.clone(), runner);
        let handle = tokio::spawn(coordinator.run(events, shutdown.clone()));

        Orchestrator {
            mode: self.mode,
            publisher,
            registry,
            gates,
            shutdown,
            handle: Some(handle),
        }
    }
}
