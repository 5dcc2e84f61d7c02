//! Health probes and the runner that executes them for a dependency edge.
//!
//! # Main Components
//!
//! - [`HealthProbe`] - a single readiness check against a running resource
//! - [`ProbeFactory`] / [`HealthCheckDescriptor`] - attached to a resource, builds its probe
//! - [`HealthCheckRunner`] - finds the nearest descriptor and runs the probe under the
//!   [`ResiliencyPolicy`](crate::resiliency::ResiliencyPolicy)
//! - [`TcpConnectProbe`] - reachability probe for any resource with a `host:port` endpoint
//!
//! # Testing
//!
//! See the [`mock`] module for scripted probes and factories.

pub mod error;
pub mod mock;
pub mod probe;
pub mod runner;
pub mod tcp;

pub use error::ProbeError;
pub use probe::*;
pub use runner::HealthCheckRunner;
pub use tcp::TcpConnectProbe;
