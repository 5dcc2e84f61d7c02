use async_trait::async_trait;
use depends_on::coordinator::WaitError;
use depends_on::model::{LifecycleSnapshot, Resource, ResourceId, ResourceModel};
use depends_on::runtime::{ExecutionMode, Orchestrator};
use depends_on::status::StatusSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records every "Waiting" status instead of publishing it.
#[derive(Default)]
struct RecordingSink {
    waiting: Mutex<Vec<ResourceId>>,
}

impl RecordingSink {
    fn waiting(&self) -> Vec<ResourceId> {
        self.waiting.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn publish_waiting(&self, resource: &ResourceId) {
        self.waiting.lock().unwrap().push(resource.clone());
    }
}

fn start(model: ResourceModel) -> (Orchestrator, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::builder(model).status_sink(sink.clone()).start();
    (orchestrator, sink)
}

/// Lets the coordinator drain everything that is currently queued.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// A resource with no declarations starts right away and never reports "Waiting".
#[tokio::test]
async fn test_resource_without_dependencies_starts_immediately() {
    let (orchestrator, sink) = start(ResourceModel::new().with_resource(Resource::new("db")));

    let result = orchestrator
        .wait_for_dependencies(&"db".into(), &CancellationToken::new())
        .await;

    assert_eq!(result, Ok(()));
    assert!(orchestrator.gate(&"db".into()).is_none());
    assert!(sink.waiting().is_empty());
    orchestrator.shutdown().await.unwrap();
}

/// The default edge ignores "Starting" and resolves on "Running".
#[tokio::test(start_paused = true)]
async fn test_default_edge_resolves_on_running() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("a"))
        .with_resource(Resource::new("b").wait_for("a"));
    let (orchestrator, sink) = start(model);
    let events = orchestrator.publisher();

    let gate = orchestrator.gate(&"b".into()).expect("b has a gate");
    let waiter = tokio::spawn(async move { gate.wait(&CancellationToken::new()).await });

    events.publish("a", LifecycleSnapshot::starting()).unwrap();
    settle().await;
    assert!(!waiter.is_finished());
    assert_eq!(orchestrator.pending_edges(), 1);

    events.publish("a", LifecycleSnapshot::running()).unwrap();
    assert_eq!(waiter.await.unwrap(), Ok(()));
    assert_eq!(orchestrator.pending_edges(), 0);
    assert_eq!(sink.waiting(), vec![ResourceId::new("b")]);

    orchestrator.shutdown().await.unwrap();
}

/// An explicit allowed-state set is not failed by a terminal state; the edge stays pending.
#[tokio::test(start_paused = true)]
async fn test_explicit_states_ignore_terminal_exit() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("a"))
        .with_resource(Resource::new("c").wait_for_states("a", ["Ready"]));
    let (orchestrator, _sink) = start(model);
    let events = orchestrator.publisher();

    events.publish("a", LifecycleSnapshot::running()).unwrap();
    events.publish("a", LifecycleSnapshot::exited(1)).unwrap();
    settle().await;

    let gate = orchestrator.gate(&"c".into()).unwrap();
    assert!(!gate.edges()[0].signal.is_resolved());
    assert_eq!(orchestrator.pending_edges(), 1);

    let cancel = CancellationToken::new();
    let wait = tokio::time::timeout(Duration::from_secs(60), gate.wait(&cancel)).await;
    assert!(wait.is_err(), "edge on an unreachable state must stay pending");

    orchestrator.shutdown().await.unwrap();
}

/// A terminal state before "Running" fails a default edge.
#[tokio::test]
async fn test_default_edge_fails_when_dependency_exits() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("api").wait_for("db"));
    let (orchestrator, _sink) = start(model);

    orchestrator
        .publisher()
        .publish("db", LifecycleSnapshot::failed_to_start())
        .unwrap();

    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;
    assert_eq!(
        result,
        Err(WaitError::DependencyFailedToStart { resource: "db".into() })
    );
    orchestrator.shutdown().await.unwrap();
}

/// Completion edges resolve on any terminal state, including a failed exit.
#[tokio::test]
async fn test_completion_edge_resolves_on_failed_exit() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("migrations"))
        .with_resource(Resource::new("api").wait_for_completion("migrations"));
    let (orchestrator, _sink) = start(model);
    let events = orchestrator.publisher();

    events.publish("migrations", LifecycleSnapshot::running()).unwrap();
    events.publish("migrations", LifecycleSnapshot::exited(3)).unwrap();

    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;
    assert_eq!(result, Ok(()));
    orchestrator.shutdown().await.unwrap();
}

/// The first failing edge fails the gate even while other edges are still pending.
#[tokio::test]
async fn test_gate_fails_fast() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("cache"))
        .with_resource(Resource::new("api").wait_for("db").wait_for("cache"));
    let (orchestrator, _sink) = start(model);

    orchestrator
        .publisher()
        .publish("cache", LifecycleSnapshot::exited(137))
        .unwrap();

    let result = orchestrator
        .wait_for_dependencies(&"api".into(), &CancellationToken::new())
        .await;
    assert_eq!(
        result,
        Err(WaitError::DependencyFailedToStart { resource: "cache".into() })
    );
    assert_eq!(orchestrator.pending_edges(), 1);
    orchestrator.shutdown().await.unwrap();
}

/// A chain: migrations waits on db, api waits on both.
#[tokio::test]
async fn test_chain_releases_in_order() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("migrations").wait_for("db"))
        .with_resource(Resource::new("api").wait_for("db").wait_for_completion("migrations"));
    let (orchestrator, sink) = start(model);
    let events = orchestrator.publisher();
    let cancel = CancellationToken::new();

    events.publish("db", LifecycleSnapshot::running()).unwrap();
    orchestrator
        .wait_for_dependencies(&"migrations".into(), &cancel)
        .await
        .unwrap();

    events.publish("migrations", LifecycleSnapshot::running()).unwrap();
    events.publish("migrations", LifecycleSnapshot::exited(0)).unwrap();
    orchestrator
        .wait_for_dependencies(&"api".into(), &cancel)
        .await
        .unwrap();

    let mut waiting = sink.waiting();
    waiting.sort();
    assert_eq!(waiting, vec![ResourceId::new("api"), ResourceId::new("migrations")]);
    orchestrator.shutdown().await.unwrap();
}

/// Without an explicit sink, "Waiting" goes through the orchestrator's own event stream
/// and can satisfy an edge that waits for it.
#[tokio::test]
async fn test_waiting_status_is_a_lifecycle_event() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("api").wait_for("db"))
        .with_resource(Resource::new("dashboard").wait_for_states("api", ["Waiting"]));
    let orchestrator = Orchestrator::builder(model).start();
    let api = orchestrator.gate(&"api".into()).unwrap();

    let api_wait = tokio::spawn(async move { api.wait(&CancellationToken::new()).await });
    orchestrator
        .wait_for_dependencies(&"dashboard".into(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!api_wait.is_finished());
    api_wait.abort();
    orchestrator.shutdown().await.unwrap();
}

/// Cancelling the caller's token ends the wait without resolving anything.
#[tokio::test(start_paused = true)]
async fn test_caller_cancellation() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("api").wait_for("db"));
    let (orchestrator, _sink) = start(model);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = orchestrator.wait_for_dependencies(&"api".into(), &cancel).await;

    assert_eq!(result, Err(WaitError::Cancelled));
    assert_eq!(orchestrator.pending_edges(), 1);
    orchestrator.shutdown().await.unwrap();
}

/// Publish mode creates no edges and never blocks.
#[tokio::test]
async fn test_publish_mode_never_waits() {
    let model = ResourceModel::new()
        .with_resource(Resource::new("db"))
        .with_resource(Resource::new("api").wait_for("db"));
    let orchestrator = Orchestrator::builder(model)
        .mode(ExecutionMode::Publish)
        .start();

    assert_eq!(orchestrator.mode(), ExecutionMode::Publish);
    assert_eq!(orchestrator.pending_edges(), 0);
    assert!(orchestrator.gate(&"api".into()).is_none());
    assert_eq!(
        orchestrator
            .wait_for_dependencies(&"api".into(), &CancellationToken::new())
            .await,
        Ok(())
    );
    orchestrator.shutdown().await.unwrap();
}
