use depends_on::config::{DependsOnOptions, RetryOptions, TimeoutOptions};
use depends_on::coordinator::WaitError;
use depends_on::health::mock::{MockProbe, MockProbeFactory};
use depends_on::health::HealthCheckDescriptor;
use depends_on::model::{LifecycleSnapshot, Resource, ResourceId, ResourceModel};
use depends_on::resiliency::BackoffType;
use depends_on::runtime::Orchestrator;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn options(
    max_attempts: u32,
    backoff: BackoffType,
    delay: Duration,
    timeout: Duration,
) -> DependsOnOptions {
    DependsOnOptions {
        retry: RetryOptions {
            max_attempts,
            backoff,
            delay,
            max_delay: Duration::from_secs(30),
            jitter: false,
        },
        timeout: TimeoutOptions { timeout },
    }
}

fn db_and_api(factory: &MockProbeFactory) -> ResourceModel {
    ResourceModel::new()
        .with_resource(Resource::new("db").with_health_check(factory.descriptor()))
        .with_resource(Resource::new("api").wait_for("db"))
}

/// Pattern: real coordinator + scripted probe.
/// Two failures then success, with exponential backoff of 1s and 2s.
#[tokio::test(start_paused = true)]
async fn test_health_check_retries_until_healthy() {
    let probe = MockProbe::new();
    probe.expect_checks(2).return_unhealthy("still starting");
    probe.expect_check().return_healthy();
    let factory = MockProbeFactory::returning(probe.clone());

    let orchestrator = Orchestrator::start(
        db_and_api(&factory),
        &options(3, BackoffType::Exponential, Duration::from_secs(1), Duration::from_secs(5)),
    );

    let started = Instant::now();
    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;

    assert_eq!(result, Ok(()));
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100),
        "elapsed {elapsed:?}"
    );
    probe.verify();
    assert_eq!(probe.calls(), 3);
    orchestrator.shutdown().await.unwrap();
}

/// The attempt budget counts every invocation, the first one included.
#[tokio::test(start_paused = true)]
async fn test_health_check_gives_up_after_max_attempts() {
    let probe = MockProbe::new();
    probe.expect_checks(3).return_error("connection refused");
    let factory = MockProbeFactory::returning(probe.clone());

    let orchestrator = Orchestrator::start(
        db_and_api(&factory),
        &options(3, BackoffType::None, Duration::from_secs(1), Duration::from_secs(5)),
    );

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(WaitError::HealthCheckFailed {
            resource: "db".into(),
            attempts: 3,
            reason: "connection refused".into(),
        })
    );
    probe.verify();
    orchestrator.shutdown().await.unwrap();
}

/// Each attempt gets its own timeout window.
#[tokio::test(start_paused = true)]
async fn test_each_attempt_has_a_fresh_timeout() {
    let probe = MockProbe::new();
    probe.expect_checks(2).hang();
    probe.expect_check().return_healthy();
    let factory = MockProbeFactory::returning(probe.clone());

    let orchestrator = Orchestrator::start(
        db_and_api(&factory),
        &options(3, BackoffType::None, Duration::from_secs(1), Duration::from_secs(5)),
    );

    let started = Instant::now();
    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await
        .unwrap();

    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(12) && elapsed < Duration::from_millis(12100),
        "elapsed {elapsed:?}"
    );
    probe.verify();
    orchestrator.shutdown().await.unwrap();
}

/// A probe that cannot be built fails the edge once, without retries.
#[tokio::test]
async fn test_construction_failure_fails_the_edge() {
    let factory = MockProbeFactory::failing("missing credentials");
    let orchestrator = Orchestrator::start(db_and_api(&factory), &DependsOnOptions::default());

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;

    assert_eq!(
        result,
        Err(WaitError::HealthCheckConstructionFailed {
            resource: "db".into(),
            reason: "missing credentials".into(),
        })
    );
    assert_eq!(factory.constructions(), 1);
    orchestrator.shutdown().await.unwrap();
}

/// A child without its own health check is probed through its parent's descriptor.
#[tokio::test]
async fn test_health_check_inherited_from_parent() {
    let factory = MockProbeFactory::returning(MockProbe::always_healthy());
    let model = ResourceModel::new()
        .with_resource(Resource::new("postgres").with_health_check(factory.descriptor()))
        .with_resource(Resource::new("db").with_parent("postgres"))
        .with_resource(Resource::new("api").wait_for("db"));
    let orchestrator = Orchestrator::start(model, &DependsOnOptions::default());

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(factory.created_for(), vec![ResourceId::new("postgres")]);
    orchestrator.shutdown().await.unwrap();
}

/// Several dependents of one target share one event but get one check each.
#[tokio::test]
async fn test_each_edge_is_checked_once() {
    let probe = MockProbe::always_healthy();
    let factory = MockProbeFactory::returning(probe.clone());
    let model = ResourceModel::new()
        .with_resource(Resource::new("db").with_health_check(factory.descriptor()))
        .with_resource(Resource::new("api").wait_for("db"))
        .with_resource(Resource::new("worker").wait_for("db"));
    let orchestrator = Orchestrator::start(model, &DependsOnOptions::default());
    let events = orchestrator.publisher();
    let cancel = CancellationToken::new();

    events.publish("db", LifecycleSnapshot::running()).unwrap();
    events.publish("db", LifecycleSnapshot::running()).unwrap();
    orchestrator.wait_for_dependencies(&"api".into(), &cancel).await.unwrap();
    orchestrator.wait_for_dependencies(&"worker".into(), &cancel).await.unwrap();

    assert_eq!(probe.calls(), 2);
    assert_eq!(factory.constructions(), 2);
    orchestrator.shutdown().await.unwrap();
}

/// Shutdown cancels a check in flight; its dependent sees `Cancelled`.
#[tokio::test]
async fn test_shutdown_cancels_running_checks() {
    let probe = MockProbe::new();
    probe.expect_check().hang();
    let factory = MockProbeFactory::returning(probe.clone());
    let orchestrator = Orchestrator::start(db_and_api(&factory), &DependsOnOptions::default());

    let gate = orchestrator.gate(&"api".into()).unwrap();
    let waiter = tokio::spawn(async move { gate.wait(&CancellationToken::new()).await });

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    while probe.calls() == 0 {
        tokio::task::yield_now().await;
    }
    orchestrator.shutdown().await.unwrap();

    assert_eq!(waiter.await.unwrap(), Err(WaitError::Cancelled));
}

/// End to end against a real listener with the TCP probe.
#[tokio::test]
async fn test_tcp_probe_against_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let model = ResourceModel::new()
        .with_resource(
            Resource::new("db")
                .with_endpoint(format!("tcp://127.0.0.1:{port}"))
                .with_health_check(HealthCheckDescriptor::tcp()),
        )
        .with_resource(Resource::new("api").wait_for("db"));
    let orchestrator = Orchestrator::start(model, &DependsOnOptions::default());

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await
        .unwrap();

    orchestrator.shutdown().await.unwrap();
}

/// Completion edges go through the health check too; a degraded result is retried.
#[tokio::test(start_paused = true)]
async fn test_completion_edge_runs_health_check() {
    let probe = MockProbe::new();
    probe.expect_check().return_degraded("flushing");
    probe.expect_check().return_healthy();
    let factory = MockProbeFactory::returning(probe.clone());
    let model = ResourceModel::new()
        .with_resource(Resource::new("migrations").with_health_check(factory.descriptor()))
        .with_resource(Resource::new("api").wait_for_completion("migrations"));

    let orchestrator = Orchestrator::start(
        model,
        &options(3, BackoffType::None, Duration::from_secs(1), Duration::from_secs(5)),
    );
    let events = orchestrator.publisher();

    events.publish("migrations", LifecycleSnapshot::running()).unwrap();
    events.publish("migrations", LifecycleSnapshot::exited(0)).unwrap();
    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;

    assert_eq!(result, Ok(()));
    assert_eq!(probe.calls(), 2);
    probe.verify();
    orchestrator.shutdown().await.unwrap();
}

/// Shutdown does not wait on a probe factory that never finishes.
#[tokio::test(start_paused = true)]
async fn test_shutdown_during_health_check_construction() {
    let factory = MockProbeFactory::hanging();
    let orchestrator = Orchestrator::start(db_and_api(&factory), &DependsOnOptions::default());

    let gate = orchestrator.gate(&"api".into()).unwrap();
    let waiter = tokio::spawn(async move { gate.wait(&CancellationToken::new()).await });

    orchestrator.publisher().publish("db", LifecycleSnapshot::running()).unwrap();
    while factory.constructions() == 0 {
        tokio::task::yield_now().await;
    }

    tokio::time::timeout(Duration::from_secs(3), orchestrator.shutdown())
        .await
        .expect("shutdown waited on a stuck probe factory")
        .unwrap();
    assert_eq!(waiter.await.unwrap(), Err(WaitError::Cancelled));
}
