//! Room presence: membership transitions and queries.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{SignalError, StoreError};
use crate::gateway::events::EventName;
use crate::gateway::fanout::{OutboundEvent, SignalFanout};
use crate::store::SessionData;

use super::lifecycle::{DisconnectListener, SessionDisconnected};

/// Owns room membership transitions. A user is ever in at most one room;
/// every transition is exit-then-enter so the logic stays uniform, at the
/// cost of a redundant write pair when re-entering the same room.
#[derive(Clone)]
pub struct RoomPresence {
    data: SessionData,
    fanout: SignalFanout,
}

impl RoomPresence {
    pub fn new(data: SessionData, fanout: SignalFanout) -> Self {
        Self { data, fanout }
    }

    /// Enter `room_id`, exiting any prior room first.
    ///
    /// Requires a registered session: entering a room without one is an
    /// ordering error, not a recoverable user error.
    pub async fn enter_room(&self, user_id: i64, room_id: i64) -> Result<(), SignalError> {
        let info = self
            .data
            .user_session(user_id)
            .await?
            .ok_or(SignalError::SessionNotFound(user_id))?;

        if let Some(prior_room) = info.current_room_id {
            self.exit_room(user_id, prior_room).await?;
        }

        // Re-read: exit_room rewrote the session record.
        let info = self
            .data
            .user_session(user_id)
            .await?
            .ok_or(SignalError::SessionNotFound(user_id))?;

        let display_name = info.display_name.clone();
        self.data.save_user_session(&info.with_room(room_id)).await?;
        self.data.add_user_to_room(room_id, user_id).await?;

        tracing::info!(user_id, room_id, "entered room");

        self.fanout.dispatch(OutboundEvent::to_room(
            room_id,
            EventName::MEMBER_JOINED,
            serde_json::json!({ "user_id": user_id, "display_name": display_name }),
        ));
        Ok(())
    }

    /// Exit `room_id`. The session's room pointer is cleared only when it
    /// points at this room (the session may already be gone, or in another
    /// room). The departure broadcast fires only when the user was actually
    /// in the member set, so redundant exits stay silent.
    pub async fn exit_room(&self, user_id: i64, room_id: i64) -> Result<(), SignalError> {
        let was_member = self.data.room_users(room_id).await?.contains(&user_id);

        if let Some(info) = self.data.user_session(user_id).await? {
            if info.is_in_room(room_id) {
                self.data.save_user_session(&info.without_room()).await?;
            }
        }
        self.data.remove_user_from_room(room_id, user_id).await?;

        if was_member {
            tracing::info!(user_id, room_id, "exited room");

            self.fanout.dispatch(OutboundEvent::to_room(
                room_id,
                EventName::MEMBER_LEFT,
                serde_json::json!({ "user_id": user_id }),
            ));
        }
        Ok(())
    }

    /// Exit whatever room the user is in, if any. Store errors are swallowed
    /// and logged so disconnect-triggered cleanup never blocks other steps.
    pub async fn exit_all_rooms(&self, user_id: i64) {
        let current = match self.current_room_id(user_id).await {
            Ok(room) => room,
            Err(err) => {
                tracing::warn!(%err, user_id, "room lookup failed during cleanup");
                return;
            }
        };

        if let Some(room_id) = current {
            if let Err(err) = self.exit_room(user_id, room_id).await {
                tracing::warn!(%err, user_id, room_id, "room cleanup failed");
            }
        }
    }

    // -- queries: absent data is empty/zero/false, never an error ------------

    pub async fn current_room_id(&self, user_id: i64) -> Result<Option<i64>, StoreError> {
        Ok(self
            .data
            .user_session(user_id)
            .await?
            .and_then(|info| info.current_room_id))
    }

    pub async fn participants(&self, room_id: i64) -> Result<HashSet<i64>, StoreError> {
        self.data.room_users(room_id).await
    }

    pub async fn participant_count(&self, room_id: i64) -> Result<u64, StoreError> {
        self.data.room_user_count(room_id).await
    }

    pub async fn is_user_in_room(&self, user_id: i64, room_id: i64) -> Result<bool, StoreError> {
        Ok(self.current_room_id(user_id).await? == Some(room_id))
    }

    /// Membership-set check, independent of session liveness. A user whose
    /// session just died can still appear here until cleanup lands.
    pub async fn is_room_member(&self, user_id: i64, room_id: i64) -> Result<bool, StoreError> {
        Ok(self.data.room_users(room_id).await?.contains(&user_id))
    }
}

/// Disconnect listener that removes the departing user from any room.
pub struct RoomCleanup {
    presence: RoomPresence,
}

impl RoomCleanup {
    pub fn new(presence: RoomPresence) -> Self {
        Self { presence }
    }
}

#[async_trait]
impl DisconnectListener for RoomCleanup {
    async fn on_disconnect(&self, event: SessionDisconnected) {
        tracing::debug!(user_id = event.user_id, "disconnect received, cleaning up rooms");
        self.presence.exit_all_rooms(event.user_id).await;
    }
}
