//! Retry and timeout around probe invocations.
//!
//! A [`ResiliencyPolicy`] is resolved once per run and shared by every health check. The
//! timeout bounds each individual invocation; the retry strategy decides how many
//! invocations happen and how long to wait between them. Every attempt gets a fresh
//! timeout window.

pub mod error;
pub mod policy;

pub use error::{AttemptFailure, ExecutionError};
pub use policy::*;
