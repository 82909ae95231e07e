//! Snapshot of one live connection for one user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One active transport connection for one user, as stored in the session
/// store. A user owns at most one `SessionInfo` at a time; registering a new
/// one retires the existing one first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: i64,
    pub display_name: String,
    pub session_id: String,
    pub connected_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub current_room_id: Option<i64>,
}

impl SessionInfo {
    /// A freshly registered session: both timestamps at now, no room.
    pub fn new(user_id: i64, display_name: &str, session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            display_name: display_name.to_string(),
            session_id: session_id.to_string(),
            connected_at: now,
            last_active_at: now,
            current_room_id: None,
        }
    }

    /// Heartbeat: advance `last_active_at`.
    pub fn with_activity(self) -> Self {
        Self {
            last_active_at: Utc::now(),
            ..self
        }
    }

    /// Room entry: set `current_room_id`.
    pub fn with_room(self, room_id: i64) -> Self {
        Self {
            last_active_at: Utc::now(),
            current_room_id: Some(room_id),
            ..self
        }
    }

    /// Room exit: clear `current_room_id`.
    pub fn without_room(self) -> Self {
        Self {
            last_active_at: Utc::now(),
            current_room_id: None,
            ..self
        }
    }

    pub fn is_in_room(&self, room_id: i64) -> bool {
        self.current_room_id == Some(room_id)
    }
}
