//! Message envelopes for the lobby WebSocket protocol.
//!
//! Both directions use internally tagged JSON objects: a string `type`
//! discriminator with the variant's fields inlined, e.g.
//! `{"type":"chat","msg":"hello"}`. The names below are the stable
//! contract with clients.

use serde::{Deserialize, Serialize};

use crate::{SessionId, UserId};

/// Messages a connected participant may send while in a lobby.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Ready,
    Unready,
    LeaveLobby,
    Chat { msg: String },
}

/// Events fanned out to a lobby's connected participants.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LobbyEvent {
    UserJoined { user_id: UserId },
    UserLeft { user_id: UserId },
    ReadyState { user_id: UserId, ready: bool },
    Chat { user_id: UserId, msg: String },
    CountdownStarted { seconds: u64 },
    CountdownCancelled,
    GameStarting { session_id: SessionId },
    StartFailed { reason: String },
}
