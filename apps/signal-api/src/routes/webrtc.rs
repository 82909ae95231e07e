//! WebRTC client bootstrap: ICE server configuration.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/webrtc/ice-servers", get(ice_servers))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IceServersResponse {
    pub ice_servers: Vec<IceServer>,
}

#[utoipa::path(
    get,
    path = "/api/v1/webrtc/ice-servers",
    tag = "WebRTC",
    responses((status = 200, description = "ICE servers for peer connection setup", body = IceServersResponse))
)]
pub async fn ice_servers(State(state): State<AppState>) -> Json<IceServersResponse> {
    let config = &state.config;
    let mut servers = vec![IceServer {
        urls: config.stun_urls.clone(),
        username: None,
        credential: None,
    }];

    if let Some(turn_url) = &config.turn_url {
        servers.push(IceServer {
            urls: vec![turn_url.clone()],
            username: config.turn_username.clone(),
            credential: config.turn_credential.clone(),
        });
    }

    Json(IceServersResponse {
        ice_servers: servers,
    })
}
