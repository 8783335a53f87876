//! Wire-level types shared by the parlor lobby server and its clients.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod messages;

pub use messages::{ClientMsg, LobbyEvent};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifies a user account. Stable across lobbies and sessions.
    UserId
);
id_type!(
    /// Identifies a lobby, connected or not.
    LobbyId
);
id_type!(
    /// Identifies a started game session.
    SessionId
);

/// Per-lobby rule toggles agreed on before start. Carried into the game
/// session unchanged; only `auto_start` is interpreted by the lobby layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HouseRules {
    pub auto_start: bool,
    pub turn_timeout_sec: u32,
    pub freeze_on_disconnect: bool,
    pub forfeit_on_disconnect: bool,
    pub missed_round_threshold: u32,
    pub penalty_card_count: u32,
    pub allow_discard_abilities: bool,
    pub disconnection_round_limit: u32,
}

impl Default for HouseRules {
    fn default() -> Self {
        HouseRules {
            auto_start: false,
            turn_timeout_sec: 15,
            freeze_on_disconnect: false,
            forfeit_on_disconnect: false,
            missed_round_threshold: 3,
            penalty_card_count: 2,
            allow_discard_abilities: false,
            disconnection_round_limit: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LobbyType {
    Private,
    Public,
    Matchmaking,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    HeadToHead,
    #[serde(rename = "group_of_4")]
    GroupOf4,
    #[serde(rename = "circuit_4p")]
    Circuit4P,
    #[serde(rename = "circuit_7p8p")]
    Circuit7P8P,
    Custom,
}

/// A lobby as persisted by the store and returned by the HTTP API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LobbyRecord {
    pub id: LobbyId,
    pub host_user_id: UserId,
    pub lobby_type: LobbyType,
    pub game_mode: GameMode,
    #[serde(default)]
    pub house_rules: HouseRules,
}
