// WebSocket upgrade, the per-connection pump pair, and message dispatch.
//
// Admission happens after the upgrade so rejections arrive as proper close
// frames: subprotocol, then token, then persisted membership. Only a fully
// admitted connection is registered into a lobby.

use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use parlor_shared::{ClientMsg, LobbyEvent, LobbyId, UserId};

use crate::auth::extract_cookie_token;
use crate::lobby::{CancelHandle, LobbyConnection, LobbyState};
use crate::server::AppState;

pub async fn lobby_ws_handler(
    ws: WebSocketUpgrade,
    Path(lobby_id): Path<Uuid>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    ws.protocols(["lobby"])
        .on_upgrade(move |socket| handle_socket(socket, state, LobbyId(lobby_id), cookie))
}

async fn handle_socket(socket: WebSocket, state: AppState, lobby_id: LobbyId, cookie: Option<String>) {
    if !socket.protocol().is_some_and(|proto| proto == "lobby") {
        close_with(socket, close_code::POLICY, "client must speak the lobby subprotocol").await;
        return;
    }

    let token = cookie
        .as_deref()
        .and_then(|cookie| extract_cookie_token(cookie, "auth_token"));
    let Some(token) = token else {
        close_with(socket, close_code::POLICY, "missing auth_token").await;
        return;
    };
    let user_id = match state.verifier.verify(token).await {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::warn!(lobby_id = %lobby_id, error = %err, "rejecting connection: invalid token");
            close_with(socket, close_code::POLICY, "invalid auth_token").await;
            return;
        }
    };

    match state.store.is_user_in_lobby(lobby_id, user_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(lobby_id = %lobby_id, user_id = %user_id, "rejecting connection: not a participant");
            close_with(socket, close_code::POLICY, "user not in that lobby").await;
            return;
        }
        Err(err) => {
            tracing::warn!(lobby_id = %lobby_id, error = %err, "membership check failed");
            close_with(socket, close_code::ERROR, "membership check failed").await;
            return;
        }
    }
    let record = match state.store.get_lobby(lobby_id).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(lobby_id = %lobby_id, error = %err, "lobby lookup failed");
            close_with(socket, close_code::ERROR, "lobby lookup failed").await;
            return;
        }
    };

    let lobby = state.manager.get_or_create(&record).await;
    let (conn, outbound) = LobbyConnection::new(user_id);
    let connection_id = conn.id();
    let cancel = conn.cancel_handle();
    lobby.register(conn).await;
    tracing::info!(user_id = %user_id, lobby_id = %lobby_id, "user connected to lobby");

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_pump(sink, outbound, cancel.clone()));

    read_pump(stream, &state, &lobby, user_id, &cancel).await;

    // the single unregistration path for this connection: a no-op if the
    // user already left or was migrated into a session
    lobby.remove_connection(user_id, connection_id).await;
    cancel.cancel();
    let _ = writer.await;
    tracing::info!(user_id = %user_id, lobby_id = %lobby_id, "user disconnected from lobby");
}

/// Reads frames until close, error, or cancellation. Handling is awaited
/// inline, which throttles a single connection's inbound rate without
/// affecting the others.
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    lobby: &Arc<LobbyState>,
    user_id: UserId,
    cancel: &CancelHandle,
) {
    let mut cancelled = cancel.subscribe();
    loop {
        let frame = tokio::select! {
            _ = cancelled.wait_for(|flag| *flag) => break,
            frame = stream.next() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        match frame {
            Ok(Message::Text(text)) => {
                let value: serde_json::Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(err) => {
                        tracing::warn!(user_id = %user_id, error = %err, "invalid json from client");
                        continue;
                    }
                };
                let msg: ClientMsg = match serde_json::from_value(value) {
                    Ok(msg) => msg,
                    Err(err) => {
                        tracing::warn!(user_id = %user_id, error = %err, "unrecognized lobby message");
                        continue;
                    }
                };
                handle_lobby_message(state, lobby, user_id, msg).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // binary, ping, pong: skipped
            Err(err) => {
                tracing::info!(user_id = %user_id, error = %err, "websocket read error");
                break;
            }
        }
    }
}

/// Interprets one client message against the lobby.
async fn handle_lobby_message(
    state: &AppState,
    lobby: &Arc<LobbyState>,
    user_id: UserId,
    msg: ClientMsg,
) {
    match msg {
        ClientMsg::Ready => {
            lobby.set_ready(user_id, true).await;
            if lobby.auto_start() && lobby.are_all_ready().await {
                Arc::clone(lobby)
                    .start_countdown(state.config.countdown_seconds, Arc::clone(&state.handoff))
                    .await;
            }
        }
        ClientMsg::Unready => {
            lobby.set_ready(user_id, false).await;
            lobby.cancel_countdown().await;
        }
        ClientMsg::LeaveLobby => {
            // best effort: the in-memory leave proceeds even if persistence lags
            if let Err(err) = state
                .store
                .remove_user_from_lobby(user_id, lobby.lobby_id)
                .await
            {
                tracing::warn!(
                    user_id = %user_id,
                    lobby_id = %lobby.lobby_id,
                    error = %err,
                    "failed to remove lobby participant from store"
                );
            }
            lobby.remove(user_id).await;
        }
        ClientMsg::Chat { msg } => {
            lobby.broadcast_chat(user_id, &msg).await;
        }
    }
}

/// Writes queued events to the socket until cancellation (exits without
/// draining), queue closure, or a failed send.
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<LobbyEvent>,
    cancel: CancelHandle,
) {
    let mut cancelled = cancel.subscribe();
    loop {
        tokio::select! {
            _ = async { cancelled.wait_for(|flag| *flag).await.map(|_| ()) } => {
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::NORMAL,
                        reason: "closing".into(),
                    })))
                    .await;
                break;
            }
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize lobby event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_owned().into(),
        })))
        .await;
}
