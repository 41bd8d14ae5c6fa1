#![allow(clippy::unwrap_used)]
// End-to-end bridge tests against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use opensesame_api::{MemoryStore, ObjectMeta, PointValue};
use opensesame_core::{Bridge, BridgeConfig, CoreError, PointEntry, ReadScope, WebId};

const GARAGE: &str = "hm-rpc.1.ABC123.1.STATE";

fn switch() -> ObjectMeta {
    ObjectMeta {
        name: None,
        value_type: Some("boolean".into()),
        role: Some("switch".into()),
    }
}

fn garage() -> WebId {
    WebId::from("hm-rpc_1_ABC123_1_STATE")
}

async fn start(store: &MemoryStore, points: &[&str]) -> Bridge<MemoryStore> {
    let config = BridgeConfig::default()
        .with_points(points.iter().map(|id| PointEntry::new(*id)).collect());
    Bridge::start(config, store.clone()).await.unwrap()
}

#[tokio::test]
async fn open_then_read_shows_commanded_value() {
    let store = MemoryStore::new();
    store.insert(GARAGE, switch(), Some(false.into()));
    let bridge = start(&store, &[GARAGE]).await;
    let gateway = bridge.gateway();

    let snaps = gateway.command(&garage()).await.unwrap();
    let snap = snaps.iter().find(|s| s.web_id == garage()).unwrap();
    assert_eq!(snap.value, Some(PointValue::Bool(true)));
    assert!(!snap.pending);

    let read = gateway.read(ReadScope::Watched).await.unwrap();
    assert_eq!(read[0].value, Some(PointValue::Bool(true)));

    bridge.shutdown().await;
}

#[tokio::test]
async fn rejected_open_keeps_previous_value() {
    let store = MemoryStore::new();
    store.insert(GARAGE, switch(), Some(false.into()));
    store.reject_writes(GARAGE, "gateway offline");
    let bridge = start(&store, &[GARAGE]).await;
    let gateway = bridge.gateway();

    let err = gateway.command(&garage()).await.unwrap_err();
    assert!(matches!(err, CoreError::WriteRejected { .. }), "got: {err:?}");

    let read = gateway.read(ReadScope::Watched).await.unwrap();
    assert_eq!(read[0].value, Some(PointValue::Bool(false)));
    assert!(!read[0].pending);

    bridge.shutdown().await;
}

#[tokio::test]
async fn device_confirmation_flows_back_into_the_mirror() {
    let store = MemoryStore::new();
    store.insert(GARAGE, switch(), Some(false.into()));
    let bridge = start(&store, &[GARAGE]).await;
    let gateway = bridge.gateway();

    gateway.command(&garage()).await.unwrap();

    // The device closes the door again on its own.
    let version = bridge.mirror().version();
    store.push(GARAGE, false.into(), true);
    let mut rx = bridge.mirror().subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| *v > version))
        .await
        .unwrap()
        .unwrap();

    let snap = gateway.point(&garage()).unwrap();
    assert_eq!(snap.value, Some(PointValue::Bool(false)));

    bridge.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_issue_one_write() {
    let store = MemoryStore::new();
    store.insert(GARAGE, switch(), Some(false.into()));
    let bridge = start(&store, &[GARAGE]).await;
    let gateway = bridge.gateway();
    store.pause_writes();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.command(&garage()).await })
        })
        .collect();

    // Let every task reach the dispatcher before releasing the write.
    let mut rx = bridge.mirror().subscribe();
    let mirror = Arc::clone(bridge.mirror());
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|_| mirror.is_pending(GARAGE)))
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.resume_writes();

    let mut ok = 0;
    let mut in_flight = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(CoreError::CommandInFlight { .. }) => in_flight += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(ok >= 1);
    assert_eq!(ok + in_flight, 8);
    assert_eq!(store.write_count(GARAGE), ok);
    assert!(!bridge.mirror().is_pending(GARAGE));

    bridge.shutdown().await;
}

#[tokio::test]
async fn catalog_read_fails_entirely_on_one_bad_point() {
    let store = MemoryStore::new();
    store.insert(GARAGE, switch(), Some(false.into()));
    store.insert("zwave.0.lamp", switch(), Some(true.into()));
    let bridge = start(&store, &[GARAGE]).await;
    let gateway = bridge.gateway();

    assert_eq!(gateway.read(ReadScope::All).await.unwrap().len(), 2);

    store.fail_reads("zwave.0.lamp");
    let err = gateway.read(ReadScope::All).await.unwrap_err();
    assert!(matches!(err, CoreError::PartialReadFailure { .. }));

    bridge.shutdown().await;
}
