//! # depends-on
//!
//! > **Startup ordering for resources that depend on each other.**
//!
//! A host starts many resources (services, databases, one-off jobs). Some of them must not
//! start until others are ready. This crate lets each resource declare what it waits on,
//! watches the host's lifecycle events, and releases every dependent exactly when its
//! dependencies are ready, or fails it as soon as one of them cannot become ready.
//!
//! ## 🏗️ How It Works
//!
//! ### Edges and Signals
//! Every wait declaration becomes one **edge** with a one-shot **completion signal**. The
//! dependent awaits the signals; the coordinator resolves them. A signal resolves once and
//! keeps its first result forever.
//!
//! ### Event-Driven Matching
//! The [`WaitCoordinator`](coordinator::WaitCoordinator) consumes lifecycle events in order.
//! For each event it removes every edge on that resource whose condition the new snapshot
//! satisfies, in one atomic step, and then decides the edge's fate:
//! - a terminal state on a default edge fails it immediately,
//! - anything else runs the target's health check, under retry and timeout.
//!
//! ### Health Checks
//! A resource without its own health check inherits its nearest ancestor's. Probes are
//! retried according to the [`ResiliencyPolicy`](resiliency::ResiliencyPolicy) built from
//! [`DependsOnOptions`](config::DependsOnOptions).
//!
//! ### Observability
//! Everything is logged through `tracing` with structured fields (`resource`,
//! `dependency`, `edge`). See [`runtime::setup_tracing`].
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Model ([`model`])
//! Resources, their parent links, endpoints, health checks and wait declarations.
//! - **Key items**: [`Resource`](model::Resource), [`ResourceModel`](model::ResourceModel),
//!   [`WaitCondition`](model::WaitCondition), [`LifecycleSnapshot`](model::LifecycleSnapshot).
//!
//! ### 2. The Graph ([`graph`], [`signal`])
//! Pending edges keyed by target, and the signals dependents wait on.
//! - **Key items**: [`PendingEdgeRegistry`](graph::PendingEdgeRegistry),
//!   [`DependencyGraphBuilder`](graph::DependencyGraphBuilder),
//!   [`CompletionSignal`](signal::CompletionSignal).
//!
//! ### 3. The Engine ([`coordinator`], [`health`], [`resiliency`])
//! The watch loop, the startup gate, probes and the retry/timeout policy.
//!
//! ### 4. The Orchestrator ([`runtime`])
//! Wires a run together and shuts it down.
//! - **Key items**: [`Orchestrator`](runtime::Orchestrator),
//!   [`ExecutionMode`](runtime::ExecutionMode).
//!
//! ## 🚀 Quick Start
//!
//! ```ignore
//! let model = ResourceModel::new()
//!     .with_resource(
//!         Resource::new("db")
//!             .with_endpoint("localhost:5432")
//!             .with_health_check(HealthCheckDescriptor::tcp()),
//!     )
//!     .with_resource(Resource::new("migrations").wait_for("db"))
//!     .with_resource(Resource::new("api").wait_for("db").wait_for_completion("migrations"));
//!
//! let orchestrator = Orchestrator::start(model, &DependsOnOptions::load()?);
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod config;
pub mod coordinator;
pub mod events;
pub mod graph;
pub mod health;
pub mod model;
pub mod resiliency;
pub mod runtime;
pub mod signal;
pub mod status;
