pub mod health;
pub mod rooms;
pub mod status;
pub mod webrtc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest(
            "/api/v1",
            status::router()
                .merge(rooms::router())
                .merge(webrtc::router()),
        )
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Status
        status::status,
        // Rooms
        rooms::list_participants,
        // WebRTC
        webrtc::ice_servers,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Route response types
            health::HealthResponse,
            status::StatusResponse,
            rooms::ParticipantsResponse,
            webrtc::IceServer,
            webrtc::IceServersResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Status", description = "Service status"),
        (name = "Rooms", description = "Room presence"),
        (name = "WebRTC", description = "WebRTC client bootstrap"),
    )
)]
pub struct ApiDoc;
