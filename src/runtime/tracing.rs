/// Initializes structured logging for a host embedding the coordinator.
///
/// Verbosity comes from `RUST_LOG`:
/// - `RUST_LOG=info` - edge registration summary, waits, health-check results
/// - `RUST_LOG=depends_on=debug` - every state change and retry
///
/// Calling it more than once, or after another subscriber was installed, is a no-op.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
