//! WebSocket upgrade handler and per-connection event loop.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time;

use beacon_common::id::{prefix, prefixed_ulid};

use crate::error::SignalError;
use crate::signaling::relay::Caller;
use crate::AppState;

use super::events::{
    ClientMessage, EventName, GatewayMessage, IdentifyPayload, RoomPayload, OP_ENTER_ROOM,
    OP_EXIT_ROOM, OP_HEARTBEAT, OP_IDENTIFY, OP_SIGNAL,
};
use super::fanout::{OutboundEvent, Route};

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_UNKNOWN_OPCODE: u16 = 4001;
const CLOSE_NOT_AUTHENTICATED: u16 = 4003;
const CLOSE_AUTH_FAILED: u16 = 4004;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;
const CLOSE_SESSION_EVICTED: u16 = 4010;

/// Timeout for receiving IDENTIFY after connection (seconds).
const IDENTIFY_TIMEOUT_SECS: u64 = 10;

/// Interval at which clients are expected to heartbeat (milliseconds).
pub const HEARTBEAT_INTERVAL_MS: u64 = 41_250;

type WsSink = futures_util::stream::SplitSink<WebSocket, Message>;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Step 1: Wait for IDENTIFY within timeout.
    let identify_result = time::timeout(Duration::from_secs(IDENTIFY_TIMEOUT_SECS), async {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(?e, "ws read error during identify");
                    return Err("read error");
                }
            };

            let text = match msg {
                Message::Text(t) => t,
                Message::Close(_) => return Err("client closed"),
                Message::Ping(_) | Message::Pong(_) => continue,
                _ => continue,
            };

            let client_msg: ClientMessage = match serde_json::from_str(&text) {
                Ok(m) => m,
                Err(_) => {
                    let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                    return Err("invalid json");
                }
            };

            match client_msg.op {
                OP_IDENTIFY => {
                    let payload: IdentifyPayload = serde_json::from_value(client_msg.d)
                        .map_err(|_| "invalid identify payload")?;
                    return Ok(payload);
                }
                _ => {
                    let _ =
                        send_close(&mut ws_tx, CLOSE_NOT_AUTHENTICATED, "Expected IDENTIFY").await;
                    return Err("expected identify");
                }
            }
        }
        Err("connection closed before identify")
    })
    .await;

    let payload = match identify_result {
        Ok(Ok(payload)) => payload,
        Ok(Err(reason)) => {
            tracing::debug!(%reason, "identify handshake failed");
            let _ = send_close(&mut ws_tx, CLOSE_AUTH_FAILED, reason).await;
            return;
        }
        Err(_timeout) => {
            let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Handshake timeout").await;
            return;
        }
    };

    // Step 2: register the session and announce READY.
    let session_id = prefixed_ulid(prefix::SESSION);
    let evicted = match state
        .lifecycle
        .add_session(payload.user_id, &payload.display_name, &session_id)
        .await
    {
        Ok(evicted) => evicted,
        Err(e) => {
            tracing::error!(?e, user_id = payload.user_id, "failed to register session");
            let _ = send_close(&mut ws_tx, CLOSE_AUTH_FAILED, "Session registration failed").await;
            return;
        }
    };

    // Duplicate login: tell the superseded connection to shut down instead
    // of letting it idle until heartbeat timeout.
    if let Some(evicted) = evicted {
        state.fanout.dispatch(OutboundEvent::to_session(
            evicted,
            EventName::SESSION_EVICTED,
            serde_json::json!({}),
        ));
    }

    let caller = Caller {
        user_id: payload.user_id,
        display_name: payload.display_name,
        session_id: session_id.clone(),
    };

    tracing::info!(
        session_id = %caller.session_id,
        user_id = caller.user_id,
        "gateway session established"
    );

    // Subscribe before READY so nothing published after registration is lost.
    let fanout_rx = state.fanout.subscribe();

    let ready = GatewayMessage::dispatch(
        EventName::READY,
        serde_json::json!({
            "session_id": caller.session_id,
            "user": { "id": caller.user_id, "display_name": caller.display_name },
            "heartbeat_interval_ms": HEARTBEAT_INTERVAL_MS,
        }),
    );
    let ready_json = serde_json::to_string(&ready).unwrap();
    if ws_tx.send(Message::Text(ready_json.into())).await.is_err() {
        state.lifecycle.remove_session(&caller.session_id).await;
        return;
    }

    // Step 3: run the main event loop.
    run_session(&state, &caller, ws_tx, ws_rx, fanout_rx).await;

    // Step 4: disconnect — notify listeners, then tear the session down.
    state.lifecycle.remove_session(&caller.session_id).await;

    tracing::info!(
        session_id = %caller.session_id,
        user_id = caller.user_id,
        "gateway session ended"
    );
}

/// Main session event loop: read client messages, forward fanout events,
/// enforce heartbeat.
async fn run_session(
    state: &AppState,
    caller: &Caller,
    mut ws_tx: WsSink,
    mut ws_rx: futures_util::stream::SplitStream<WebSocket>,
    mut fanout_rx: broadcast::Receiver<std::sync::Arc<super::fanout::OutboundEvent>>,
) {
    // Room this connection currently receives room-routed events for.
    let mut current_room: Option<i64> = None;

    // Heartbeat deadline: client must heartbeat within 1.5× the interval.
    let heartbeat_deadline = Duration::from_millis(HEARTBEAT_INTERVAL_MS * 3 / 2);
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            // Client sends us a message.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg: ClientMessage = match serde_json::from_str(&text) {
                            Ok(m) => m,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Invalid JSON").await;
                                break;
                            }
                        };

                        match client_msg.op {
                            OP_HEARTBEAT => {
                                got_heartbeat = true;
                                if let Err(e) = state.lifecycle.update_last_activity(caller.user_id).await {
                                    tracing::warn!(?e, user_id = caller.user_id, "heartbeat store update failed");
                                }
                                let ack = GatewayMessage::heartbeat_ack();
                                let json = serde_json::to_string(&ack).unwrap();
                                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                            OP_ENTER_ROOM => {
                                let payload: RoomPayload = match serde_json::from_value(client_msg.d) {
                                    Ok(p) => p,
                                    Err(e) => {
                                        let err = SignalError::ValidationFailed(e.to_string());
                                        if send_error(&mut ws_tx, &err).await.is_err() {
                                            break;
                                        }
                                        continue;
                                    }
                                };
                                match enter_room(state, caller, payload.room_id).await {
                                    Ok(joined) => {
                                        current_room = Some(payload.room_id);
                                        let json = serde_json::to_string(&joined).unwrap();
                                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(err) => {
                                        if send_error(&mut ws_tx, &err).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            OP_EXIT_ROOM => {
                                let payload: RoomPayload = match serde_json::from_value(client_msg.d) {
                                    Ok(p) => p,
                                    Err(e) => {
                                        let err = SignalError::ValidationFailed(e.to_string());
                                        if send_error(&mut ws_tx, &err).await.is_err() {
                                            break;
                                        }
                                        continue;
                                    }
                                };
                                match state.presence.exit_room(caller.user_id, payload.room_id).await {
                                    Ok(()) => {
                                        if current_room == Some(payload.room_id) {
                                            current_room = None;
                                        }
                                        let left = GatewayMessage::dispatch(
                                            EventName::ROOM_LEFT,
                                            serde_json::json!({ "room_id": payload.room_id }),
                                        );
                                        let json = serde_json::to_string(&left).unwrap();
                                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(err) => {
                                        if send_error(&mut ws_tx, &err).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            OP_SIGNAL => {
                                let request = match serde_json::from_value(client_msg.d) {
                                    Ok(r) => r,
                                    Err(e) => {
                                        let err = SignalError::ValidationFailed(e.to_string());
                                        if send_error(&mut ws_tx, &err).await.is_err() {
                                            break;
                                        }
                                        continue;
                                    }
                                };
                                if let Err(err) = state.relay.dispatch(Some(caller), request).await {
                                    if send_error(&mut ws_tx, &err).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            OP_IDENTIFY => {
                                // Already identified.
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Already identified").await;
                                break;
                            }
                            _ => {
                                let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_OPCODE, "Unknown opcode").await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, session_id = %caller.session_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Outbound event from the fanout hub.
            result = fanout_rx.recv() => {
                match result {
                    Ok(event) => {
                        let for_us = match &event.route {
                            Route::Session(session_id) => *session_id == caller.session_id,
                            Route::Room(room_id) => current_room == Some(*room_id),
                        };
                        if !for_us {
                            continue;
                        }

                        if event.event_name == EventName::SESSION_EVICTED {
                            tracing::info!(
                                session_id = %caller.session_id,
                                "session superseded by a new login"
                            );
                            let _ = send_close(&mut ws_tx, CLOSE_SESSION_EVICTED, "Session superseded").await;
                            break;
                        }

                        let msg = GatewayMessage::dispatch(event.event_name, event.data.clone());
                        let json = serde_json::to_string(&msg).unwrap();
                        if ws_tx.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            session_id = %caller.session_id,
                            skipped = n,
                            "gateway session lagged behind fanout"
                        );
                        // Continue — we just drop the missed events.
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            // Heartbeat timeout check.
            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(
                        session_id = %caller.session_id,
                        "heartbeat timeout — closing connection"
                    );
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

/// Put the user in the room and build the ROOM_JOINED reply.
async fn enter_room(
    state: &AppState,
    caller: &Caller,
    room_id: i64,
) -> Result<GatewayMessage, SignalError> {
    state.presence.enter_room(caller.user_id, room_id).await?;

    let participants = state.presence.participants(room_id).await?;
    let count = participants.len();
    let mut participants: Vec<i64> = participants.into_iter().collect();
    participants.sort_unstable();

    Ok(GatewayMessage::dispatch(
        EventName::ROOM_JOINED,
        serde_json::json!({
            "room_id": room_id,
            "participants": participants,
            "participant_count": count,
        }),
    ))
}

/// Report a signaling failure to the offending connection only. Internal
/// failure details stay in the logs.
async fn send_error(ws_tx: &mut WsSink, err: &SignalError) -> Result<(), axum::Error> {
    let message = if err.is_internal() {
        tracing::error!(?err, "internal signaling failure");
        "internal signaling error".to_string()
    } else {
        err.to_string()
    };

    let msg = GatewayMessage::dispatch(
        EventName::ERROR,
        serde_json::json!({ "code": err.code(), "message": message }),
    );
    let json = serde_json::to_string(&msg).unwrap();
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
