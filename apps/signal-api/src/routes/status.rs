//! Service status: online session count and gateway parameters.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::gateway::server::HEARTBEAT_INTERVAL_MS;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Number of currently connected users.
    pub online_count: i64,
    /// Interval clients should heartbeat at, in milliseconds.
    pub heartbeat_interval_ms: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    responses((status = 200, description = "Current service status", body = StatusResponse))
)]
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let online_count = state.registry.total_online_count().await?;
    Ok(Json(StatusResponse {
        online_count,
        heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
    }))
}
