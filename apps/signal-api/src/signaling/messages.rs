//! Signaling wire types.
//!
//! The caller's identity is never taken from these payloads — it comes from
//! the authenticated transport context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Audio,
    Video,
    ScreenShare,
}

/// An inbound signaling message, tagged by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalRequest {
    Offer {
        room_id: i64,
        target_user_id: i64,
        sdp: String,
        #[serde(default)]
        media_type: Option<MediaType>,
    },
    Answer {
        room_id: i64,
        target_user_id: i64,
        sdp: String,
        #[serde(default)]
        media_type: Option<MediaType>,
    },
    IceCandidate {
        room_id: i64,
        target_user_id: i64,
        candidate: String,
        #[serde(default)]
        sdp_mid: Option<String>,
        #[serde(default)]
        sdp_mline_index: Option<u32>,
    },
    MediaToggle {
        room_id: i64,
        media_type: MediaType,
        enabled: bool,
    },
}

/// Kind tag echoed in unicast responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Unicast payload delivered to exactly one resolved session.
#[derive(Debug, Clone, Serialize)]
pub struct SignalResponse {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub from_user_id: i64,
    pub target_user_id: i64,
    pub room_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl SignalResponse {
    /// Offer/Answer payload.
    pub fn session_description(
        kind: SignalKind,
        from_user_id: i64,
        target_user_id: i64,
        room_id: i64,
        sdp: String,
        media_type: Option<MediaType>,
    ) -> Self {
        Self {
            kind,
            from_user_id,
            target_user_id,
            room_id,
            sdp: Some(sdp),
            media_type,
            candidate: None,
            sdp_mid: None,
            sdp_mline_index: None,
            timestamp: Utc::now(),
        }
    }

    /// ICE candidate payload.
    pub fn ice_candidate(
        from_user_id: i64,
        target_user_id: i64,
        room_id: i64,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_mline_index: Option<u32>,
    ) -> Self {
        Self {
            kind: SignalKind::IceCandidate,
            from_user_id,
            target_user_id,
            room_id,
            sdp: None,
            media_type: None,
            candidate: Some(candidate),
            sdp_mid,
            sdp_mline_index,
            timestamp: Utc::now(),
        }
    }
}

/// Media-state change broadcast to a room's status channel.
#[derive(Debug, Clone, Serialize)]
pub struct MediaStateResponse {
    pub user_id: i64,
    pub display_name: String,
    pub media_type: MediaType,
    pub enabled: bool,
    pub timestamp: DateTime<Utc>,
}

impl MediaStateResponse {
    pub fn new(user_id: i64, display_name: &str, media_type: MediaType, enabled: bool) -> Self {
        Self {
            user_id,
            display_name: display_name.to_string(),
            media_type,
            enabled,
            timestamp: Utc::now(),
        }
    }
}
