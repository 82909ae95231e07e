//! Room presence endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/rooms/{room_id}/participants", get(list_participants))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantsResponse {
    pub room_id: i64,
    /// User ids currently present, ascending.
    pub participants: Vec<i64>,
    pub participant_count: usize,
}

#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}/participants",
    tag = "Rooms",
    params(("room_id" = i64, Path, description = "Room id")),
    responses((status = 200, description = "Users currently in the room", body = ParticipantsResponse))
)]
pub async fn list_participants(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let mut participants: Vec<i64> = state
        .presence
        .participants(room_id)
        .await?
        .into_iter()
        .collect();
    participants.sort_unstable();
    let participant_count = participants.len();

    Ok(Json(ParticipantsResponse {
        room_id,
        participants,
        participant_count,
    }))
}
