//! Hub room-membership semantics: single-room subscriptions, idempotent
//! disconnects, and pruning of senders whose receiving task has gone away.

use std::sync::Arc;

use chrono::Utc;
use syncboard_core::domain::{ActivityKind, ActivityRecord};
use syncboard_core::error::AppError;
use syncboard_core::realtime::{ActivityEvent, RealtimeHub};
use tokio::sync::mpsc;
use uuid::Uuid;

fn event(message: &str) -> ActivityEvent {
    ActivityEvent::new(ActivityRecord {
        id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        actor_id: Uuid::new_v4(),
        kind: ActivityKind::Notify,
        message: message.to_string(),
        object_type: None,
        object_id: None,
        metadata: None,
        created_at: Utc::now(),
    })
}

#[tokio::test]
async fn subscribing_again_moves_the_connection() {
    let hub = Arc::new(RealtimeHub::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let conn = hub.register(tx).await;

    hub.subscribe(conn, "acme").await.unwrap();
    assert_eq!(hub.room_size("acme").await, 1);

    hub.subscribe(conn, "globex").await.unwrap();
    assert_eq!(hub.room_size("acme").await, 0);
    assert_eq!(hub.room_size("globex").await, 1);
    assert_eq!(hub.current_room(conn).await.as_deref(), Some("globex"));
}

#[tokio::test]
async fn disconnected_ids_cannot_rejoin() {
    let hub = Arc::new(RealtimeHub::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let conn = hub.register(tx).await;
    hub.subscribe(conn, "acme").await.unwrap();

    hub.disconnect(conn).await;
    assert_eq!(hub.connection_count().await, 0);
    assert_eq!(hub.room_size("acme").await, 0);

    let err = hub.subscribe(conn, "acme").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Disconnecting twice is harmless.
    hub.disconnect(conn).await;
    assert_eq!(hub.connection_count().await, 0);
}

#[tokio::test]
async fn unsubscribe_reports_the_room_left() {
    let hub = Arc::new(RealtimeHub::new());
    let (tx, _rx) = mpsc::unbounded_channel();
    let conn = hub.register(tx).await;
    hub.subscribe(conn, "acme").await.unwrap();

    assert_eq!(hub.unsubscribe(conn).await.as_deref(), Some("acme"));
    assert_eq!(hub.unsubscribe(conn).await, None);
    assert_eq!(hub.current_room(conn).await, None);
    // Still registered, just roomless.
    assert_eq!(hub.connection_count().await, 1);
}

#[tokio::test]
async fn broadcast_prunes_dead_subscribers() {
    let hub = Arc::new(RealtimeHub::new());

    let (tx_live, mut rx_live) = mpsc::unbounded_channel();
    let (tx_dead, rx_dead) = mpsc::unbounded_channel();
    let live = hub.register(tx_live).await;
    let dead = hub.register(tx_dead).await;
    hub.subscribe(live, "acme").await.unwrap();
    hub.subscribe(dead, "acme").await.unwrap();

    // Simulate the receiving task going away.
    drop(rx_dead);

    let delivered = hub.broadcast("acme", &event("hello")).await;
    assert_eq!(delivered, 1);
    assert!(rx_live.recv().await.unwrap().contains("hello"));

    // The dead connection was swept out entirely.
    assert_eq!(hub.connection_count().await, 1);
    assert_eq!(hub.room_size("acme").await, 1);
}

#[tokio::test]
async fn broadcast_to_unknown_room_delivers_nothing() {
    let hub = Arc::new(RealtimeHub::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = hub.register(tx).await;
    hub.subscribe(conn, "acme").await.unwrap();

    assert_eq!(hub.broadcast("nowhere", &event("lost")).await, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn roomless_connections_receive_nothing() {
    let hub = Arc::new(RealtimeHub::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = hub.register(tx).await;
    hub.subscribe(conn, "acme").await.unwrap();
    hub.unsubscribe(conn).await;

    assert_eq!(hub.broadcast("acme", &event("after leave")).await, 0);
    assert!(rx.try_recv().is_err());
}
