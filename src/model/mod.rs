//! Resource model: identities, lifecycle snapshots and wait declarations.
//!
//! A [`ResourceModel`] is built once per orchestrator run, before any resource starts, and
//! shared read-only afterwards. Each [`Resource`] carries the declarations that say which
//! other resources it waits on and under which [`WaitCondition`].

pub mod condition;
pub mod resource;
pub mod snapshot;

pub use condition::*;
pub use resource::*;
pub use snapshot::*;
