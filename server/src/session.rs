// Session handoff: turns a lobby's connected membership into a running
// game session and migrates the live connections across.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use parlor_shared::{HouseRules, LobbyId, SessionId, UserId};

use crate::lobby::{LobbyConnection, LobbyState};
use crate::store::{LobbyStore, StoreError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not enough connected participants to start")]
    NotEnoughPlayers,
    #[error("rules engine rejected the membership: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One seat at the table, in final play order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeatAssignment {
    pub user_id: UserId,
    /// Seat number persisted when the user joined the lobby, if any.
    pub seat_number: Option<u32>,
}

/// Construction boundary of the card-game rules engine. Given the final
/// seating, house rules, and host, it either produces a session id or
/// rejects the membership.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(
        &self,
        seats: &[SeatAssignment],
        rules: &HouseRules,
        host: UserId,
    ) -> Result<SessionId, SessionError>;
}

/// Built-in factory used until the full rules engine is wired in: enforces
/// the minimum table size and mints a session id.
pub struct LocalSessionFactory {
    pub min_players: usize,
}

impl Default for LocalSessionFactory {
    fn default() -> Self {
        Self { min_players: 2 }
    }
}

#[async_trait]
impl SessionFactory for LocalSessionFactory {
    async fn create_session(
        &self,
        seats: &[SeatAssignment],
        _rules: &HouseRules,
        _host: UserId,
    ) -> Result<SessionId, SessionError> {
        if seats.len() < self.min_players {
            return Err(SessionError::NotEnoughPlayers);
        }
        Ok(SessionId::random())
    }
}

/// A started game session: the final seat order plus the connections
/// migrated out of the lobby. The lobby's persisted identity survives for
/// audit, but these users no longer receive lobby broadcasts.
pub struct GameSession {
    pub id: SessionId,
    pub lobby_id: LobbyId,
    pub host_user_id: UserId,
    pub house_rules: HouseRules,
    pub seats: Vec<SeatAssignment>,
    pub connections: HashMap<UserId, LobbyConnection>,
}

/// Runs handoffs and retains the sessions they produce.
pub struct SessionHandoff {
    store: Arc<dyn LobbyStore>,
    factory: Arc<dyn SessionFactory>,
    sessions: Mutex<HashMap<SessionId, GameSession>>,
}

impl SessionHandoff {
    pub fn new(store: Arc<dyn LobbyStore>, factory: Arc<dyn SessionFactory>) -> Arc<Self> {
        Arc::new(Self {
            store,
            factory,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Starts a session from `lobby`'s current connected membership.
    ///
    /// Seat order is ascending by `(seat_number, user_id)`; participants
    /// with no persisted seat sort after seated ones. The same membership
    /// snapshot always yields the same order. On failure the lobby is told
    /// via a `start_failed` event and its ready/countdown state is left
    /// intact for retry.
    pub async fn start(&self, lobby: &Arc<LobbyState>) -> Result<SessionId, SessionError> {
        let members = lobby.connected_users().await;
        let seats = match self.seat_order(lobby.lobby_id, members).await {
            Ok(seats) => seats,
            Err(err) => {
                lobby.broadcast_start_failed(&err.to_string()).await;
                return Err(err);
            }
        };

        match self
            .factory
            .create_session(&seats, lobby.house_rules(), lobby.host_user_id)
            .await
        {
            Ok(session_id) => {
                let users: Vec<UserId> = seats.iter().map(|seat| seat.user_id).collect();
                let connections = lobby.migrate_for_session(session_id, &users).await;
                tracing::info!(
                    lobby_id = %lobby.lobby_id,
                    session_id = %session_id,
                    players = connections.len(),
                    "game session started"
                );
                let session = GameSession {
                    id: session_id,
                    lobby_id: lobby.lobby_id,
                    host_user_id: lobby.host_user_id,
                    house_rules: lobby.house_rules().clone(),
                    seats,
                    connections,
                };
                self.sessions.lock().await.insert(session_id, session);
                Ok(session_id)
            }
            Err(err) => {
                tracing::warn!(lobby_id = %lobby.lobby_id, error = %err, "session start rejected");
                lobby.broadcast_start_failed(&err.to_string()).await;
                Err(err)
            }
        }
    }

    async fn seat_order(
        &self,
        lobby_id: LobbyId,
        members: Vec<UserId>,
    ) -> Result<Vec<SeatAssignment>, SessionError> {
        let records = self.store.participants(lobby_id).await?;
        let persisted: HashMap<UserId, u32> = records
            .iter()
            .map(|row| (row.user_id, row.seat_number))
            .collect();
        let mut seats: Vec<SeatAssignment> = members
            .into_iter()
            .map(|user_id| SeatAssignment {
                user_id,
                seat_number: persisted.get(&user_id).copied(),
            })
            .collect();
        seats.sort_by_key(|seat| (seat.seat_number.is_none(), seat.seat_number, seat.user_id));
        Ok(seats)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn player_count(&self, session_id: SessionId) -> Option<usize> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .map(|session| session.connections.len())
    }

    pub async fn seats(&self, session_id: SessionId) -> Option<Vec<SeatAssignment>> {
        self.sessions
            .lock()
            .await
            .get(&session_id)
            .map(|session| session.seats.clone())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Factory that records the seat order of every call and can be told to
    /// reject all memberships.
    pub(crate) struct RecordingFactory {
        reject: Option<String>,
        calls: StdMutex<Vec<Vec<UserId>>>,
    }

    impl RecordingFactory {
        pub(crate) fn accepting() -> Arc<Self> {
            Arc::new(Self {
                reject: None,
                calls: StdMutex::new(Vec::new()),
            })
        }

        pub(crate) fn rejecting(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reject: Some(reason.to_owned()),
                calls: StdMutex::new(Vec::new()),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub(crate) fn calls(&self) -> Vec<Vec<UserId>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionFactory for RecordingFactory {
        async fn create_session(
            &self,
            seats: &[SeatAssignment],
            _rules: &HouseRules,
            _host: UserId,
        ) -> Result<SessionId, SessionError> {
            self.calls
                .lock()
                .unwrap()
                .push(seats.iter().map(|seat| seat.user_id).collect());
            match &self.reject {
                Some(reason) => Err(SessionError::Rejected(reason.clone())),
                None => Ok(SessionId::random()),
            }
        }
    }
}
