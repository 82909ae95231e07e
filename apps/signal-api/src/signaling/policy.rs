//! Membership policy seam: may these two users signal each other?

use async_trait::async_trait;

use crate::error::SignalError;
use crate::session::presence::RoomPresence;

/// External membership check consulted before any signal is routed.
///
/// The default implementation answers from live room presence; deployments
/// with a durable room-membership store can substitute their own.
#[async_trait]
pub trait SignalPolicy: Send + Sync {
    /// Pairwise check for unicast signals (offer/answer/ICE).
    async fn authorize_signal(
        &self,
        room_id: i64,
        from_user_id: i64,
        target_user_id: i64,
    ) -> Result<(), SignalError>;

    /// Sender-only check for room-wide media-state broadcasts.
    async fn authorize_media_change(&self, room_id: i64, user_id: i64) -> Result<(), SignalError>;
}

/// Policy backed by the room presence service: sender and target must both
/// currently be in the stated room.
pub struct PresencePolicy {
    presence: RoomPresence,
}

impl PresencePolicy {
    pub fn new(presence: RoomPresence) -> Self {
        Self { presence }
    }
}

#[async_trait]
impl SignalPolicy for PresencePolicy {
    async fn authorize_signal(
        &self,
        room_id: i64,
        from_user_id: i64,
        target_user_id: i64,
    ) -> Result<(), SignalError> {
        if from_user_id == target_user_id {
            tracing::warn!(user_id = from_user_id, "attempted to signal self");
            return Err(SignalError::ValidationFailed(
                "cannot signal yourself".to_string(),
            ));
        }

        if !self.presence.is_room_member(from_user_id, room_id).await? {
            tracing::warn!(room_id, user_id = from_user_id, "signal from outside room");
            return Err(SignalError::ValidationFailed(format!(
                "sender is not in room {room_id}"
            )));
        }

        if !self.presence.is_room_member(target_user_id, room_id).await? {
            tracing::warn!(room_id, target_user_id, "signal target not in room");
            return Err(SignalError::ValidationFailed(format!(
                "target is not in room {room_id}"
            )));
        }

        Ok(())
    }

    async fn authorize_media_change(
        &self,
        room_id: i64,
        user_id: i64,
    ) -> Result<(), SignalError> {
        if !self.presence.is_room_member(user_id, room_id).await? {
            tracing::warn!(room_id, user_id, "media change from outside room");
            return Err(SignalError::ValidationFailed(format!(
                "sender is not in room {room_id}"
            )));
        }
        Ok(())
    }
}
