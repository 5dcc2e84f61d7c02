//! Dependency edges: the pending-edge registry and the builder that fills it.
//!
//! Edges are created once per run, before any resource starts, and removed by the
//! coordinator as it resolves them.

pub mod builder;
pub mod registry;

pub use builder::DependencyGraphBuilder;
pub use registry::*;
