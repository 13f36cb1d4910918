//! Worker behavior over in-memory stores.

use std::sync::Arc;

use apalis::prelude::{Data, Error};
use clubhouse_common::FanoutConfig;
use clubhouse_core::MessageFanoutService;
use clubhouse_core::testing::{InMemoryStore, RecordingPushGateway};
use clubhouse_queue::{FanoutContext, MessageCreatedJob, message_created_worker};

fn context(store: &Arc<InMemoryStore>, gateway: &Arc<RecordingPushGateway>) -> Data<FanoutContext> {
    let fanout = MessageFanoutService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        gateway.clone(),
        &FanoutConfig::default(),
    );
    Data::new(FanoutContext::new(fanout))
}

fn job(sender: Option<&str>) -> MessageCreatedJob {
    MessageCreatedJob {
        message_id: Some("msg1".to_string()),
        community_id: Some("club1".to_string()),
        sender_id: sender.map(ToString::to_string),
        text: Some("Club fair on Friday".to_string()),
    }
}

#[tokio::test]
async fn processes_job_end_to_end() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_members("club1", &["alice", "bob", "dana"])
            .with_token("bob", "t1"),
    );
    let gateway = Arc::new(RecordingPushGateway::new());

    message_created_worker(job(Some("alice")), context(&store, &gateway))
        .await
        .unwrap();

    assert_eq!(store.notifications().len(), 2);
    assert_eq!(gateway.calls().len(), 1);
    assert_eq!(gateway.calls()[0].0, vec!["t1".to_string()]);
}

#[tokio::test]
async fn malformed_job_is_aborted_without_side_effects() {
    let store = Arc::new(InMemoryStore::new().with_members("club1", &["alice", "bob"]));
    let gateway = Arc::new(RecordingPushGateway::new());

    let err = message_created_worker(job(None), context(&store, &gateway))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Abort(_)));
    assert!(store.notifications().is_empty());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn store_failure_is_retried() {
    let store = Arc::new(InMemoryStore::new().fail_membership_query());
    let gateway = Arc::new(RecordingPushGateway::new());

    let err = message_created_worker(job(Some("alice")), context(&store, &gateway))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Failed(_)));
}

#[tokio::test]
async fn redelivered_job_completes_missing_work_only() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_members("club1", &["alice", "bob", "dana"])
            .with_token("bob", "t1"),
    );
    let gateway = Arc::new(RecordingPushGateway::new());

    message_created_worker(job(Some("alice")), context(&store, &gateway))
        .await
        .unwrap();
    message_created_worker(job(Some("alice")), context(&store, &gateway))
        .await
        .unwrap();

    assert_eq!(store.notifications().len(), 2);
    assert_eq!(store.notifications_for("bob").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn worker_runs_on_spawned_task() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_members("club1", &["alice", "bob", "dana"])
            .with_token("bob", "t1")
            .with_token("dana", "t2"),
    );
    let gateway = Arc::new(RecordingPushGateway::new());
    let ctx = context(&store, &gateway);

    tokio::spawn(message_created_worker(job(Some("alice")), ctx))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(store.notifications().len(), 2);
    assert_eq!(gateway.calls().len(), 1);
}
