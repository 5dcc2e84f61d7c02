//! # Wait Coordination
//!
//! The event-driven side of startup ordering.
//!
//! # Main Components
//!
//! - [`WaitCoordinator`] - consumes lifecycle events, matches them against pending edges and
//!   resolves each edge's signal exactly once
//! - [`StartupGate`] - what a dependent awaits before it may start
//! - [`WaitError`] - why an edge resolved to failure
//!
//! The coordinator processes events one at a time. Health checks run as separate tasks so a
//! slow probe never holds up the stream; a later event for the same target cannot re-resolve
//! an edge because the registry has already handed it out.

pub mod error;
pub mod gate;
pub mod watcher;

pub use error::WaitError;
pub use gate::{GateEdge, StartupGate};
pub use watcher::WaitCoordinator;
