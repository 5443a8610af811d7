//! Realtime distribution: connection hub and websocket endpoint

pub mod hub;
pub mod ws;

pub use hub::{ActivityEvent, ConnectionId, RealtimeHub};
