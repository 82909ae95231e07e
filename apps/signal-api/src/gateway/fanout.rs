//! Broadcast hub for delivering outbound events to connected sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel carrying routed payloads.
//! Each connection task subscribes and filters locally: unicast payloads by
//! its own session id, room payloads by the room it is currently in. Slow
//! receivers that fall behind skip messages (delivery is best-effort).

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

const BROADCAST_CAPACITY: usize = 4096;

/// Where an outbound event is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Exactly one resolved session, by transport session id.
    Session(String),
    /// Every subscriber of a room's status channel.
    Room(i64),
}

/// A payload published to the fanout hub.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub route: Route,
    /// The dispatch event name (e.g. "WEBRTC_SIGNAL").
    pub event_name: &'static str,
    pub data: Value,
}

impl OutboundEvent {
    pub fn to_session(session_id: String, event_name: &'static str, data: Value) -> Self {
        Self {
            route: Route::Session(session_id),
            event_name,
            data,
        }
    }

    pub fn to_room(room_id: i64, event_name: &'static str, data: Value) -> Self {
        Self {
            route: Route::Room(room_id),
            event_name,
            data,
        }
    }
}

/// The global fanout hub. Cloneable — store in AppState.
#[derive(Clone)]
pub struct SignalFanout {
    sender: broadcast::Sender<Arc<OutboundEvent>>,
}

impl SignalFanout {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to outbound events. Each connection task calls this once.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OutboundEvent>> {
        self.sender.subscribe()
    }

    /// Publish an event. send() errs when there are no receivers — fine.
    pub fn dispatch(&self, event: OutboundEvent) {
        let _ = self.sender.send(Arc::new(event));
    }
}

impl Default for SignalFanout {
    fn default() -> Self {
        Self::new()
    }
}
