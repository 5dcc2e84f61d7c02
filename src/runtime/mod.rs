//! Runtime wiring for one orchestrator run.
//!
//! # Main Components
//!
//! - [`Orchestrator`] - builds the dependency graph, runs the wait coordinator and hands out
//!   startup gates
//! - [`ExecutionMode`] - run vs. publish; publishing never waits
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod orchestrator;
pub mod tracing;

pub use orchestrator::*;
pub use tracing::*;
