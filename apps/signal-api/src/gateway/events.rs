//! Gateway opcodes, event names, and wire-format messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_DISPATCH: u8 = 0;
pub const OP_IDENTIFY: u8 = 1;
pub const OP_HEARTBEAT: u8 = 2;
pub const OP_HEARTBEAT_ACK: u8 = 3;
pub const OP_ENTER_ROOM: u8 = 4;
pub const OP_EXIT_ROOM: u8 = 5;
pub const OP_SIGNAL: u8 = 8;

// ---------------------------------------------------------------------------
// Server → Client message
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    pub d: Value,
}

impl GatewayMessage {
    /// Build a DISPATCH message (op=0).
    pub fn dispatch(event_name: &str, data: Value) -> Self {
        Self {
            op: OP_DISPATCH,
            t: Some(event_name.to_string()),
            d: data,
        }
    }

    /// Build a HEARTBEAT_ACK message (op=3).
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OP_HEARTBEAT_ACK,
            t: None,
            d: serde_json::json!({}),
        }
    }
}

// ---------------------------------------------------------------------------
// Client → Server message
// ---------------------------------------------------------------------------

/// A message received from the client over WebSocket.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
}

// ---------------------------------------------------------------------------
// Client payloads
// ---------------------------------------------------------------------------

/// IDENTIFY payload. The identity is supplied by the already-authenticated
/// transport context; this service never authenticates it itself.
#[derive(Debug, Deserialize)]
pub struct IdentifyPayload {
    pub user_id: i64,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomPayload {
    pub room_id: i64,
}

// ---------------------------------------------------------------------------
// Dispatch event types
// ---------------------------------------------------------------------------

/// Event names dispatched to clients.
pub struct EventName;

impl EventName {
    pub const READY: &'static str = "READY";
    pub const ROOM_JOINED: &'static str = "ROOM_JOINED";
    pub const ROOM_LEFT: &'static str = "ROOM_LEFT";
    pub const MEMBER_JOINED: &'static str = "MEMBER_JOINED";
    pub const MEMBER_LEFT: &'static str = "MEMBER_LEFT";
    pub const WEBRTC_SIGNAL: &'static str = "WEBRTC_SIGNAL";
    pub const MEDIA_STATE: &'static str = "MEDIA_STATE";
    pub const ERROR: &'static str = "ERROR";
    /// Internal control event addressed to a superseded session; the
    /// connection loop converts it to a close frame instead of dispatching.
    pub const SESSION_EVICTED: &'static str = "SESSION_EVICTED";
}
