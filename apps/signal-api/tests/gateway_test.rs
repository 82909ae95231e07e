mod common;

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time;
use tokio_tungstenite::tungstenite;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Helper: start an actual TCP server for WebSocket testing.
/// Returns (addr, state). The server runs in the background.
async fn start_ws_server() -> (SocketAddr, signal_api::AppState) {
    let state = common::test_state();
    let app = signal_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Helper: connect to the gateway, send IDENTIFY, and read READY.
/// Returns the stream and the assigned session id.
async fn connect_and_identify(
    addr: SocketAddr,
    user_id: i64,
    display_name: &str,
) -> (WsStream, String) {
    let url = format!("ws://{addr}/gateway");
    let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    let (mut write, mut read) = ws_stream.split();

    let identify = serde_json::json!({
        "op": 1,
        "d": { "user_id": user_id, "display_name": display_name }
    });
    write
        .send(tungstenite::Message::Text(identify.to_string().into()))
        .await
        .expect("send identify");

    let msg = time::timeout(Duration::from_secs(5), read.next())
        .await
        .expect("timeout waiting for READY")
        .expect("stream ended")
        .expect("ws read error");

    let text = msg.into_text().expect("not text");
    let ready: serde_json::Value = serde_json::from_str(&text).expect("parse READY");
    assert_eq!(ready["op"], 0, "READY should be op=0 (DISPATCH)");
    assert_eq!(ready["t"], "READY");

    let session_id = ready["d"]["session_id"].as_str().expect("session_id").to_string();
    assert!(session_id.starts_with("sig_"));
    assert_eq!(ready["d"]["user"]["id"], user_id);
    assert!(ready["d"]["heartbeat_interval_ms"].as_u64().unwrap() > 0);

    let ws = read.reunite(write).expect("reunite");
    (ws, session_id)
}

/// Helper: read dispatches until one matches the event name and predicate.
async fn wait_for_dispatch<F>(ws: &mut WsStream, event_name: &str, predicate: F) -> serde_json::Value
where
    F: Fn(&serde_json::Value) -> bool,
{
    let deadline = Duration::from_secs(5);
    loop {
        let msg = time::timeout(deadline, ws.next())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for {event_name}"))
            .expect("stream ended")
            .expect("ws read error");

        let text = match msg {
            tungstenite::Message::Text(t) => t,
            _ => continue,
        };
        let value: serde_json::Value = serde_json::from_str(&text).expect("parse dispatch");
        if value["op"] == 0 && value["t"] == event_name && predicate(&value["d"]) {
            return value["d"].clone();
        }
    }
}

async fn send_op(ws: &mut WsStream, op: u8, d: serde_json::Value) {
    let msg = serde_json::json!({ "op": op, "d": d });
    ws.send(tungstenite::Message::Text(msg.to_string().into()))
        .await
        .expect("send");
}

async fn expect_close(ws: &mut WsStream, code: u16) {
    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout")
        .expect("stream ended")
        .expect("read error");

    match msg {
        tungstenite::Message::Close(Some(frame)) => {
            assert_eq!(
                frame.code,
                tungstenite::protocol::frame::coding::CloseCode::from(code)
            );
        }
        tungstenite::Message::Close(None) => {}
        other => panic!("Expected Close frame, got: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identify_returns_ready_and_registers_session() {
    let (addr, state) = start_ws_server().await;

    let (_ws, session_id) = connect_and_identify(addr, 1, "alice").await;

    assert!(state.registry.is_connected(1).await.unwrap());
    assert_eq!(
        state.registry.user_id_by_session(&session_id).await.unwrap(),
        Some(1)
    );
    assert_eq!(state.registry.total_online_count().await.unwrap(), 1);
}

#[tokio::test]
async fn first_message_must_be_identify() {
    let (addr, _state) = start_ws_server().await;

    let url = format!("ws://{addr}/gateway");
    let (mut ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("ws connect");

    send_op(&mut ws, 2, serde_json::json!({})).await;
    expect_close(&mut ws, 4003).await;
}

#[tokio::test]
async fn heartbeat_returns_ack() {
    let (addr, _state) = start_ws_server().await;
    let (mut ws, _) = connect_and_identify(addr, 1, "alice").await;

    send_op(&mut ws, 2, serde_json::json!({})).await;

    let msg = time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timeout")
        .expect("stream ended")
        .expect("read error");
    let text = msg.into_text().expect("not text");
    let ack: serde_json::Value = serde_json::from_str(&text).expect("parse ack");
    assert_eq!(ack["op"], 3);
}

#[tokio::test]
async fn unknown_opcode_closes_connection() {
    let (addr, _state) = start_ws_server().await;
    let (mut ws, _) = connect_and_identify(addr, 1, "alice").await;

    send_op(&mut ws, 99, serde_json::json!({})).await;
    expect_close(&mut ws, 4001).await;
}

#[tokio::test]
async fn enter_room_replies_and_broadcasts_member_joined() {
    let (addr, state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;
    let (mut bob, _) = connect_and_identify(addr, 2, "bob").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    let joined = wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;
    assert_eq!(joined["room_id"], 7);
    assert_eq!(joined["participants"], serde_json::json!([1]));

    send_op(&mut bob, 4, serde_json::json!({ "room_id": 7 })).await;
    let joined = wait_for_dispatch(&mut bob, "ROOM_JOINED", |_| true).await;
    assert_eq!(joined["participants"], serde_json::json!([1, 2]));
    assert_eq!(joined["participant_count"], 2);

    // Alice is told about bob.
    let member = wait_for_dispatch(&mut alice, "MEMBER_JOINED", |d| d["user_id"] == 2).await;
    assert_eq!(member["display_name"], "bob");

    assert_eq!(state.presence.participant_count(7).await.unwrap(), 2);
}

#[tokio::test]
async fn exit_room_notifies_remaining_members() {
    let (addr, state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;
    let (mut bob, _) = connect_and_identify(addr, 2, "bob").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;
    send_op(&mut bob, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut bob, "ROOM_JOINED", |_| true).await;

    send_op(&mut bob, 5, serde_json::json!({ "room_id": 7 })).await;
    let left = wait_for_dispatch(&mut bob, "ROOM_LEFT", |_| true).await;
    assert_eq!(left["room_id"], 7);

    wait_for_dispatch(&mut alice, "MEMBER_LEFT", |d| d["user_id"] == 2).await;

    assert_eq!(state.presence.participant_count(7).await.unwrap(), 1);
    assert_eq!(state.presence.current_room_id(2).await.unwrap(), None);
}

#[tokio::test]
async fn entering_second_room_leaves_the_first() {
    let (addr, state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |d| d["room_id"] == 7).await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 8 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |d| d["room_id"] == 8).await;

    assert_eq!(state.presence.participant_count(7).await.unwrap(), 0);
    assert_eq!(state.presence.current_room_id(1).await.unwrap(), Some(8));
}

#[tokio::test]
async fn offer_is_delivered_only_to_target() {
    let (addr, _state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;
    let (mut bob, _) = connect_and_identify(addr, 2, "bob").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;
    send_op(&mut bob, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut bob, "ROOM_JOINED", |_| true).await;
    // Bob sees his own join broadcast; drain it before asserting silence.
    wait_for_dispatch(&mut bob, "MEMBER_JOINED", |d| d["user_id"] == 2).await;

    send_op(
        &mut bob,
        8,
        serde_json::json!({
            "type": "OFFER",
            "room_id": 7,
            "target_user_id": 1,
            "sdp": "v=0 test-offer",
            "media_type": "VIDEO"
        }),
    )
    .await;

    let signal = wait_for_dispatch(&mut alice, "WEBRTC_SIGNAL", |_| true).await;
    assert_eq!(signal["type"], "OFFER");
    assert_eq!(signal["from_user_id"], 2);
    assert_eq!(signal["target_user_id"], 1);
    assert_eq!(signal["sdp"], "v=0 test-offer");

    // Nothing comes back to the sender.
    let nothing = time::timeout(Duration::from_millis(300), bob.next()).await;
    assert!(nothing.is_err(), "sender should receive no echo");
}

#[tokio::test]
async fn signal_to_non_member_reports_validation_error() {
    let (addr, _state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;

    send_op(
        &mut alice,
        8,
        serde_json::json!({
            "type": "OFFER",
            "room_id": 7,
            "target_user_id": 999,
            "sdp": "v=0"
        }),
    )
    .await;

    let error = wait_for_dispatch(&mut alice, "ERROR", |_| true).await;
    assert_eq!(error["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn signal_to_offline_member_reports_target_offline() {
    let (addr, state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;
    let (mut bob, bob_session) = connect_and_identify(addr, 2, "bob").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;
    send_op(&mut bob, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut bob, "ROOM_JOINED", |_| true).await;

    // Kill bob's session record while his room membership lingers.
    state.registry.terminate_session(&bob_session).await.unwrap();

    send_op(
        &mut alice,
        8,
        serde_json::json!({
            "type": "ICE_CANDIDATE",
            "room_id": 7,
            "target_user_id": 2,
            "candidate": "candidate:0 1 UDP 1 192.0.2.1 3478 typ host"
        }),
    )
    .await;

    let error = wait_for_dispatch(&mut alice, "ERROR", |_| true).await;
    assert_eq!(error["code"], "TARGET_OFFLINE");
}

#[tokio::test]
async fn media_toggle_is_broadcast_to_the_room() {
    let (addr, _state) = start_ws_server().await;
    let (mut alice, _) = connect_and_identify(addr, 1, "alice").await;
    let (mut bob, _) = connect_and_identify(addr, 2, "bob").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;
    send_op(&mut bob, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut bob, "ROOM_JOINED", |_| true).await;

    send_op(
        &mut bob,
        8,
        serde_json::json!({
            "type": "MEDIA_TOGGLE",
            "room_id": 7,
            "media_type": "AUDIO",
            "enabled": false
        }),
    )
    .await;

    let media = wait_for_dispatch(&mut alice, "MEDIA_STATE", |_| true).await;
    assert_eq!(media["user_id"], 2);
    assert_eq!(media["media_type"], "AUDIO");
    assert_eq!(media["enabled"], false);
}

#[tokio::test]
async fn disconnect_cleans_up_session_and_rooms() {
    let (addr, state) = start_ws_server().await;
    let (mut alice, session_id) = connect_and_identify(addr, 1, "alice").await;

    send_op(&mut alice, 4, serde_json::json!({ "room_id": 7 })).await;
    wait_for_dispatch(&mut alice, "ROOM_JOINED", |_| true).await;

    alice
        .close(None)
        .await
        .expect("close");
    drop(alice);

    // Cleanup happens after the server notices the close.
    let mut cleaned = false;
    for _ in 0..50 {
        if !state.registry.is_connected(1).await.unwrap()
            && state.presence.participant_count(7).await.unwrap() == 0
        {
            cleaned = true;
            break;
        }
        time::sleep(Duration::from_millis(100)).await;
    }
    assert!(cleaned, "disconnect should remove session and room presence");
    assert_eq!(
        state.registry.user_id_by_session(&session_id).await.unwrap(),
        None
    );
    assert_eq!(state.registry.total_online_count().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_login_closes_previous_connection() {
    let (addr, _state) = start_ws_server().await;
    let (mut first, _) = connect_and_identify(addr, 1, "alice").await;
    let (_second, _) = connect_and_identify(addr, 1, "alice").await;

    // The superseded connection gets closed promptly, not left to idle
    // until heartbeat timeout.
    expect_close(&mut first, 4010).await;
}

#[tokio::test]
async fn duplicate_login_evicts_previous_session() {
    let (addr, state) = start_ws_server().await;
    let (_first, first_session) = connect_and_identify(addr, 1, "alice").await;
    let (_second, second_session) = connect_and_identify(addr, 1, "alice").await;

    assert_ne!(first_session, second_session);
    assert_eq!(
        state.registry.user_id_by_session(&first_session).await.unwrap(),
        None
    );
    assert_eq!(
        state
            .registry
            .session_info(1)
            .await
            .unwrap()
            .map(|info| info.session_id),
        Some(second_session)
    );
    assert_eq!(state.registry.total_online_count().await.unwrap(), 1);
}
