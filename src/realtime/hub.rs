//! Connection registry and room fan-out
//!
//! The hub tracks websocket connections and their room membership. Rooms are
//! keyed by organization slug; a connection sits in at most one room, and
//! subscribing to a new room implicitly leaves the old one. Delivery is
//! fire-and-forget over per-connection unbounded channels: a slow consumer
//! never blocks the broadcaster, and senders whose receiving task has gone
//! away are swept out during the broadcast that discovers them.

use crate::domain::ActivityRecord;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Payload broadcast to every subscriber of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub activity: ActivityRecord,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(activity: ActivityRecord) -> Self {
        Self {
            activity,
            timestamp: Utc::now(),
        }
    }

    /// Wire frame sent to subscribers.
    pub fn to_frame(&self) -> String {
        serde_json::json!({ "event": "activity", "data": self }).to_string()
    }
}

struct Connection {
    sender: mpsc::UnboundedSender<String>,
    room: Option<String>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl HubState {
    fn leave_current_room(&mut self, id: ConnectionId) -> Option<String> {
        let room = self.connections.get_mut(&id)?.room.take()?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&id);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        Some(room)
    }
}

/// Realtime fan-out hub.
#[derive(Default)]
pub struct RealtimeHub {
    state: RwLock<HubState>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel. The returned id is the
    /// handle for all later room operations.
    pub async fn register(&self, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        let mut state = self.state.write().await;
        state.connections.insert(id, Connection { sender, room: None });
        gauge!("syncboard_ws_connections").increment(1.0);
        id
    }

    /// Join a room, implicitly leaving the current one. Fails for
    /// connections that have already disconnected.
    pub async fn subscribe(&self, id: ConnectionId, room: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.connections.contains_key(&id) {
            return Err(AppError::NotFound);
        }

        state.leave_current_room(id);
        if let Some(conn) = state.connections.get_mut(&id) {
            conn.room = Some(room.to_string());
        }
        state.rooms.entry(room.to_string()).or_default().insert(id);

        Ok(())
    }

    /// Leave the current room, if any. Returns the room that was left.
    pub async fn unsubscribe(&self, id: ConnectionId) -> Option<String> {
        let mut state = self.state.write().await;
        state.leave_current_room(id)
    }

    /// Remove the connection entirely. Idempotent; a disconnected id can
    /// never re-enter a room.
    pub async fn disconnect(&self, id: ConnectionId) {
        let mut state = self.state.write().await;
        state.leave_current_room(id);
        if state.connections.remove(&id).is_some() {
            gauge!("syncboard_ws_connections").decrement(1.0);
        }
    }

    /// Deliver an event to every subscriber of a room, returning how many
    /// connections it was handed to. Senders found dead are pruned.
    pub async fn broadcast(&self, room: &str, event: &ActivityEvent) -> usize {
        let frame = event.to_frame();

        let mut delivered = 0usize;
        let mut dead: Vec<ConnectionId> = Vec::new();
        {
            let state = self.state.read().await;
            let Some(members) = state.rooms.get(room) else {
                return 0;
            };
            for id in members {
                match state.connections.get(id) {
                    Some(conn) if conn.sender.send(frame.clone()).is_ok() => delivered += 1,
                    _ => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            let mut state = self.state.write().await;
            for id in dead {
                state.leave_current_room(id);
                if state.connections.remove(&id).is_some() {
                    gauge!("syncboard_ws_connections").decrement(1.0);
                }
            }
        }

        counter!("syncboard_broadcasts_delivered_total", "room" => room.to_string())
            .increment(delivered as u64);
        delivered
    }

    /// Current number of subscribers in a room.
    pub async fn room_size(&self, room: &str) -> usize {
        let state = self.state.read().await;
        state.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    /// Room the connection currently sits in.
    pub async fn current_room(&self, id: ConnectionId) -> Option<String> {
        let state = self.state.read().await;
        state.connections.get(&id).and_then(|c| c.room.clone())
    }

    /// Total registered connections.
    pub async fn connection_count(&self) -> usize {
        let state = self.state.read().await;
        state.connections.len()
    }
}
