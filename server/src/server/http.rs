// HTTP handlers for the lobby REST API.
//
// Every endpoint authenticates the same way the WebSocket path does: the
// auth_token cookie through the configured verifier. Handlers only talk to
// the store and, for a manual start, the same session handoff the countdown
// uses.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::Rng;
use serde::Deserialize;

use parlor_shared::{GameMode, HouseRules, LobbyId, LobbyRecord, LobbyType, UserId};

use crate::auth::extract_cookie_token;
use crate::server::AppState;
use crate::session::SessionError;
use crate::store::StoreError;

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, Response> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing auth_token").into_response())?;
    let token = extract_cookie_token(cookie, "auth_token")
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing auth_token").into_response())?;
    state
        .verifier
        .verify(token)
        .await
        .map_err(|_| (StatusCode::FORBIDDEN, "invalid token").into_response())
}

fn store_error(err: StoreError) -> Response {
    match err {
        StoreError::LobbyNotFound => (StatusCode::NOT_FOUND, "lobby not found").into_response(),
        StoreError::AlreadyParticipant => {
            (StatusCode::CONFLICT, "already in that lobby").into_response()
        }
        StoreError::Unavailable(detail) => {
            tracing::error!(error = %detail, "store unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, "database error").into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateLobbyRequest {
    pub lobby_type: LobbyType,
    pub game_mode: GameMode,
    #[serde(default)]
    pub house_rules: HouseRules,
}

/// Creates a lobby hosted by the caller. The host is seated as the first
/// participant.
pub async fn create_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateLobbyRequest>,
) -> Response {
    let host = match authenticate(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let record = LobbyRecord {
        id: LobbyId::random(),
        host_user_id: host,
        lobby_type: req.lobby_type,
        game_mode: req.game_mode,
        house_rules: req.house_rules,
    };
    if let Err(err) = state.store.create_lobby(record.clone()).await {
        return store_error(err);
    }
    if let Err(err) = state.store.insert_participant(record.id, host, 1).await {
        return store_error(err);
    }
    tracing::info!(lobby_id = %record.id, host = %host, "lobby created");
    (StatusCode::OK, Json(record)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct JoinLobbyRequest {
    pub lobby_id: LobbyId,
    #[serde(default)]
    pub seat_number: Option<u32>,
}

pub async fn join_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<JoinLobbyRequest>,
) -> Response {
    let user = match authenticate(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    match state.store.is_user_in_lobby(req.lobby_id, user).await {
        Ok(true) => return (StatusCode::CONFLICT, "already in that lobby").into_response(),
        Ok(false) => {}
        Err(err) => return store_error(err),
    }
    let seat = match req.seat_number {
        Some(seat) if seat >= 1 => seat,
        _ => rand::rng().random_range(1..=1000),
    };
    if let Err(err) = state.store.insert_participant(req.lobby_id, user, seat).await {
        return store_error(err);
    }
    tracing::info!(lobby_id = %req.lobby_id, user_id = %user, seat, "user joined lobby");
    (StatusCode::OK, "joined lobby").into_response()
}

#[derive(Debug, Deserialize)]
pub struct StartLobbyRequest {
    pub lobby_id: LobbyId,
}

/// Host-only manual start: skips the countdown and runs the handoff
/// directly against the currently connected membership.
pub async fn start_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<StartLobbyRequest>,
) -> Response {
    let user = match authenticate(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let record = match state.store.get_lobby(req.lobby_id).await {
        Ok(record) => record,
        Err(err) => return store_error(err),
    };
    if record.host_user_id != user {
        return (StatusCode::FORBIDDEN, "only the lobby host can start the game").into_response();
    }

    let lobby = state.manager.get_or_create(&record).await;
    lobby.cancel_countdown().await;
    match state.handoff.start(&lobby).await {
        Ok(session_id) => {
            let num_users = state.handoff.player_count(session_id).await.unwrap_or(0);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": "game started",
                    "session_id": session_id,
                    "lobby_id": record.id,
                    "num_users": num_users,
                })),
            )
                .into_response()
        }
        Err(SessionError::Store(err)) => store_error(err),
        Err(err) => (StatusCode::CONFLICT, err.to_string()).into_response(),
    }
}

pub async fn list_lobbies(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authenticate(&state, &headers).await {
        return resp;
    }
    match state.store.list_lobbies().await {
        Ok(lobbies) => (StatusCode::OK, Json(lobbies)).into_response(),
        Err(err) => store_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct GetLobbyQuery {
    pub lobby_id: LobbyId,
}

pub async fn get_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GetLobbyQuery>,
) -> Response {
    if let Err(resp) = authenticate(&state, &headers).await {
        return resp;
    }
    match state.store.get_lobby(query.lobby_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => store_error(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteLobbyRequest {
    pub lobby_id: LobbyId,
}

pub async fn delete_lobby(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DeleteLobbyRequest>,
) -> Response {
    let user = match authenticate(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let record = match state.store.get_lobby(req.lobby_id).await {
        Ok(record) => record,
        Err(err) => return store_error(err),
    };
    if record.host_user_id != user {
        return (StatusCode::FORBIDDEN, "only the host can delete this lobby").into_response();
    }
    match state.store.delete_lobby(req.lobby_id).await {
        Ok(()) => (StatusCode::OK, "lobby deleted").into_response(),
        Err(err) => store_error(err),
    }
}
