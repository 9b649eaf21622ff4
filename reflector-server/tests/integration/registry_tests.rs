use crate::integration::init_tracing;
use crate::utils::{opus_capability, receive_only_peer, vp8_capability, MockSignalSink};
use reflector_server::RoomRegistry;
use std::sync::Arc;

#[tokio::test]
async fn attach_registers_peer_in_room() {
    init_tracing();

    let registry = RoomRegistry::new();
    let peer = receive_only_peer().await.expect("failed to create peer");
    let sink = MockSignalSink::new();

    registry
        .attach("room-a", Arc::clone(&peer), Arc::new(sink))
        .await;

    let snapshot = registry.snapshot("room-a").await;
    assert_eq!(snapshot.peer_count, 1);
    assert!(snapshot.track_ids.is_empty());
}

#[tokio::test]
async fn detach_removes_peer_from_room() {
    init_tracing();

    let registry = RoomRegistry::new();
    let peer = receive_only_peer().await.expect("failed to create peer");
    let sink = MockSignalSink::new();

    registry
        .attach("room-b", Arc::clone(&peer), Arc::new(sink))
        .await;
    registry.detach("room-b", &peer).await;

    assert_eq!(registry.snapshot("room-b").await.peer_count, 0);
}

#[tokio::test]
async fn detach_of_unknown_peer_is_noop() {
    init_tracing();

    let registry = RoomRegistry::new();
    let peer = receive_only_peer().await.expect("failed to create peer");

    registry.detach("room-c", &peer).await;

    assert_eq!(registry.snapshot("room-c").await.peer_count, 0);
}

#[tokio::test]
async fn add_track_registers_forwarded_track_by_id() {
    init_tracing();

    let registry = RoomRegistry::new();

    let local = registry
        .add_track("room-d", vp8_capability(), "cam-1".into(), "stream-1".into())
        .await;

    let snapshot = registry.snapshot("room-d").await;
    assert_eq!(snapshot.track_ids, vec!["cam-1".to_string()]);

    registry.remove_track("room-d", &local).await;
    assert!(registry.snapshot("room-d").await.track_ids.is_empty());
}

#[tokio::test]
async fn tracks_from_several_publishers_accumulate() {
    init_tracing();

    let registry = RoomRegistry::new();

    registry
        .add_track("room-e", opus_capability(), "mic-1".into(), "stream-1".into())
        .await;
    registry
        .add_track("room-e", vp8_capability(), "cam-2".into(), "stream-2".into())
        .await;

    let mut ids = registry.snapshot("room-e").await.track_ids;
    ids.sort();
    assert_eq!(ids, vec!["cam-2".to_string(), "mic-1".to_string()]);
}

#[tokio::test]
async fn snapshot_of_unknown_room_is_empty() {
    init_tracing();

    let registry = RoomRegistry::new();
    let snapshot = registry.snapshot("nowhere").await;

    assert_eq!(snapshot.peer_count, 0);
    assert!(snapshot.track_ids.is_empty());
}

#[tokio::test]
async fn keyframe_dispatch_on_idle_room_completes() {
    init_tracing();

    let registry = RoomRegistry::new();
    let peer = receive_only_peer().await.expect("failed to create peer");
    let sink = MockSignalSink::new();

    registry
        .attach("room-f", Arc::clone(&peer), Arc::new(sink))
        .await;

    // No RTP has flowed, so there is nothing to solicit; the pass must
    // still complete without touching the peer list.
    registry.dispatch_keyframe("room-f").await;
    assert_eq!(registry.snapshot("room-f").await.peer_count, 1);
}
