//! The signaling relay: validate → resolve → deliver, per message.

use std::sync::Arc;

use crate::error::SignalError;
use crate::gateway::events::EventName;
use crate::gateway::fanout::{OutboundEvent, SignalFanout};
use crate::session::registry::SessionRegistry;

use super::messages::{MediaStateResponse, SignalKind, SignalRequest, SignalResponse};
use super::policy::SignalPolicy;

/// The authenticated identity attached to an inbound message by the
/// transport layer, never taken from the message body.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i64,
    pub display_name: String,
    pub session_id: String,
}

/// Routes signaling messages between users verified to share a room.
///
/// Unicast messages go exclusively to the target's resolved session; media
/// toggles are broadcast to the room's status channel. Errors are returned
/// to the transport handler, which reports them to the caller only — no
/// routing failure ever reaches the target or tears a connection down.
#[derive(Clone)]
pub struct SignalRelay {
    registry: SessionRegistry,
    policy: Arc<dyn SignalPolicy>,
    fanout: SignalFanout,
}

impl SignalRelay {
    pub fn new(
        registry: SessionRegistry,
        policy: Arc<dyn SignalPolicy>,
        fanout: SignalFanout,
    ) -> Self {
        Self {
            registry,
            policy,
            fanout,
        }
    }

    /// Single entry point for all signaling messages.
    pub async fn dispatch(
        &self,
        caller: Option<&Caller>,
        request: SignalRequest,
    ) -> Result<(), SignalError> {
        let caller = caller.ok_or(SignalError::Unauthorized)?;

        match request {
            SignalRequest::Offer {
                room_id,
                target_user_id,
                sdp,
                media_type,
            } => {
                self.relay_session_description(
                    caller,
                    SignalKind::Offer,
                    room_id,
                    target_user_id,
                    sdp,
                    media_type,
                )
                .await
            }
            SignalRequest::Answer {
                room_id,
                target_user_id,
                sdp,
                media_type,
            } => {
                self.relay_session_description(
                    caller,
                    SignalKind::Answer,
                    room_id,
                    target_user_id,
                    sdp,
                    media_type,
                )
                .await
            }
            SignalRequest::IceCandidate {
                room_id,
                target_user_id,
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                self.policy
                    .authorize_signal(room_id, caller.user_id, target_user_id)
                    .await?;
                let target_session = self.resolve_target(target_user_id).await?;

                let response = SignalResponse::ice_candidate(
                    caller.user_id,
                    target_user_id,
                    room_id,
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                );
                tracing::debug!(
                    room_id,
                    from = caller.user_id,
                    to = target_user_id,
                    "relaying ICE candidate"
                );
                self.deliver_to_session(target_session, &response)
            }
            SignalRequest::MediaToggle {
                room_id,
                media_type,
                enabled,
            } => {
                self.policy
                    .authorize_media_change(room_id, caller.user_id)
                    .await?;

                let response = MediaStateResponse::new(
                    caller.user_id,
                    &caller.display_name,
                    media_type,
                    enabled,
                );
                tracing::info!(
                    room_id,
                    user_id = caller.user_id,
                    ?media_type,
                    enabled,
                    "broadcasting media state change"
                );
                self.fanout.dispatch(OutboundEvent::to_room(
                    room_id,
                    EventName::MEDIA_STATE,
                    to_value(&response)?,
                ));
                Ok(())
            }
        }
    }

    async fn relay_session_description(
        &self,
        caller: &Caller,
        kind: SignalKind,
        room_id: i64,
        target_user_id: i64,
        sdp: String,
        media_type: Option<super::messages::MediaType>,
    ) -> Result<(), SignalError> {
        self.policy
            .authorize_signal(room_id, caller.user_id, target_user_id)
            .await?;
        let target_session = self.resolve_target(target_user_id).await?;

        let response = SignalResponse::session_description(
            kind,
            caller.user_id,
            target_user_id,
            room_id,
            sdp,
            media_type,
        );
        tracing::info!(
            room_id,
            from = caller.user_id,
            to = target_user_id,
            ?kind,
            "relaying signal"
        );
        self.deliver_to_session(target_session, &response)
    }

    /// Resolve the target's current transport session id.
    async fn resolve_target(&self, target_user_id: i64) -> Result<String, SignalError> {
        self.registry
            .session_info(target_user_id)
            .await?
            .map(|info| info.session_id)
            .ok_or(SignalError::TargetOffline(target_user_id))
    }

    fn deliver_to_session(
        &self,
        session_id: String,
        response: &SignalResponse,
    ) -> Result<(), SignalError> {
        self.fanout.dispatch(OutboundEvent::to_session(
            session_id,
            EventName::WEBRTC_SIGNAL,
            to_value(response)?,
        ));
        Ok(())
    }
}

fn to_value<T: serde::Serialize>(payload: &T) -> Result<serde_json::Value, SignalError> {
    serde_json::to_value(payload).map_err(|e| SignalError::Internal(e.to_string()))
}
