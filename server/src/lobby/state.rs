// Authoritative in-memory state for one lobby.
//
// Every mutating operation takes the single per-lobby mutex for a short,
// I/O-free critical section. Fan-out is a non-blocking enqueue per
// recipient, so a slow consumer loses events instead of stalling the lobby.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use parlor_shared::{HouseRules, LobbyEvent, LobbyId, SessionId, UserId};

use super::connection::LobbyConnection;
use super::countdown::Countdown;
use crate::session::SessionHandoff;

pub struct LobbyState {
    pub lobby_id: LobbyId,
    pub host_user_id: UserId,
    house_rules: HouseRules,
    inner: Mutex<LobbyInner>,
}

#[derive(Default)]
struct LobbyInner {
    connections: HashMap<UserId, LobbyConnection>,
    ready: HashMap<UserId, bool>,
    countdown: Option<Countdown>,
}

impl LobbyState {
    pub fn new(lobby_id: LobbyId, host_user_id: UserId, house_rules: HouseRules) -> Arc<Self> {
        Arc::new(Self {
            lobby_id,
            host_user_id,
            house_rules,
            inner: Mutex::new(LobbyInner::default()),
        })
    }

    pub fn house_rules(&self) -> &HouseRules {
        &self.house_rules
    }

    pub fn auto_start(&self) -> bool {
        self.house_rules.auto_start
    }

    /// Registers a connection and announces the join to everyone else.
    /// A live connection under the same user id is cancelled before the new
    /// one takes its place; the stale pump unwinds through the usual
    /// unregistration path without touching the replacement.
    pub async fn register(&self, conn: LobbyConnection) {
        let user_id = conn.user_id();
        let mut inner = self.inner.lock().await;
        if let Some(old) = inner.connections.insert(user_id, conn) {
            tracing::warn!(lobby_id = %self.lobby_id, user_id = %user_id, "replacing live connection for user");
            old.cancel();
        }
        inner.ready.insert(user_id, false);
        Self::fan_out(&inner, LobbyEvent::UserJoined { user_id }, Some(user_id));
    }

    /// Updates a participant's ready flag and tells every participant,
    /// including the sender. Unreadying tears down a running countdown.
    pub async fn set_ready(&self, user_id: UserId, ready: bool) {
        let mut inner = self.inner.lock().await;
        inner.ready.insert(user_id, ready);
        Self::fan_out(&inner, LobbyEvent::ReadyState { user_id, ready }, None);
        if !ready {
            if let Some(countdown) = inner.countdown.take() {
                countdown.cancel();
                Self::fan_out(&inner, LobbyEvent::CountdownCancelled, None);
            }
        }
    }

    /// True when every currently connected participant is ready. An empty
    /// lobby is vacuously ready; disconnected participants do not count.
    pub async fn are_all_ready(&self) -> bool {
        let inner = self.inner.lock().await;
        inner
            .connections
            .keys()
            .all(|user_id| inner.ready.get(user_id).copied().unwrap_or(false))
    }

    /// Arms the delayed start and announces it. A countdown already running
    /// wins; the call is a no-op then. Returns whether a countdown was
    /// armed.
    pub async fn start_countdown(
        self: Arc<Self>,
        seconds: u64,
        handoff: Arc<SessionHandoff>,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.countdown.is_some() {
            return false;
        }
        tracing::info!(lobby_id = %self.lobby_id, seconds, "starting countdown");
        inner.countdown = Some(Countdown::arm(
            Arc::clone(&self),
            handoff,
            Duration::from_secs(seconds),
        ));
        Self::fan_out(&inner, LobbyEvent::CountdownStarted { seconds }, None);
        true
    }

    /// Cancels any running countdown and announces the cancellation. Safe
    /// to call when none is armed.
    pub async fn cancel_countdown(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.countdown.take() {
            Some(countdown) => {
                countdown.cancel();
                Self::fan_out(&inner, LobbyEvent::CountdownCancelled, None);
                true
            }
            None => false,
        }
    }

    pub async fn countdown_running(&self) -> bool {
        self.inner.lock().await.countdown.is_some()
    }

    /// Removes a participant: cancels its connection, drops its ready flag,
    /// and announces the leave to whoever remains. Idempotent. Emptying the
    /// lobby cancels any running countdown.
    pub async fn remove(&self, user_id: UserId) -> bool {
        self.remove_matching(user_id, None).await
    }

    /// Unregistration path used by a connection's own read pump: only
    /// removes the participant while the map still holds that exact
    /// connection, so a replaced connection cannot evict its successor.
    pub async fn remove_connection(&self, user_id: UserId, connection_id: u64) -> bool {
        self.remove_matching(user_id, Some(connection_id)).await
    }

    async fn remove_matching(&self, user_id: UserId, only_connection: Option<u64>) -> bool {
        let mut inner = self.inner.lock().await;
        let matches = inner
            .connections
            .get(&user_id)
            .is_some_and(|conn| only_connection.is_none_or(|id| conn.id() == id));
        if !matches {
            return false;
        }
        if let Some(conn) = inner.connections.remove(&user_id) {
            conn.cancel();
        }
        inner.ready.remove(&user_id);
        if inner.connections.is_empty() {
            if let Some(countdown) = inner.countdown.take() {
                countdown.cancel();
            }
        }
        Self::fan_out(&inner, LobbyEvent::UserLeft { user_id }, None);
        true
    }

    /// Chat fan-out. The sender does not receive its own message back.
    pub async fn broadcast_chat(&self, from: UserId, msg: &str) {
        let inner = self.inner.lock().await;
        Self::fan_out(
            &inner,
            LobbyEvent::Chat {
                user_id: from,
                msg: msg.to_owned(),
            },
            Some(from),
        );
    }

    /// Snapshot of the currently connected membership.
    pub async fn connected_users(&self) -> Vec<UserId> {
        self.inner.lock().await.connections.keys().copied().collect()
    }

    pub(crate) async fn broadcast_start_failed(&self, reason: &str) {
        let inner = self.inner.lock().await;
        Self::fan_out(
            &inner,
            LobbyEvent::StartFailed {
                reason: reason.to_owned(),
            },
            None,
        );
    }

    /// Announces the start to every participant, then moves the listed
    /// connections out of the lobby. Migrated users keep their live pumps
    /// but no longer receive lobby-scoped broadcasts.
    pub(crate) async fn migrate_for_session(
        &self,
        session_id: SessionId,
        users: &[UserId],
    ) -> HashMap<UserId, LobbyConnection> {
        let mut inner = self.inner.lock().await;
        Self::fan_out(&inner, LobbyEvent::GameStarting { session_id }, None);
        let mut migrated = HashMap::new();
        for user_id in users {
            if let Some(conn) = inner.connections.remove(user_id) {
                inner.ready.remove(user_id);
                migrated.insert(*user_id, conn);
            }
        }
        migrated
    }

    pub(crate) async fn countdown_fired(self: Arc<Self>, handoff: Arc<SessionHandoff>) {
        {
            let mut inner = self.inner.lock().await;
            inner.countdown = None;
        }
        if let Err(err) = handoff.start(&self).await {
            tracing::warn!(lobby_id = %self.lobby_id, error = %err, "countdown fired but session start failed");
        }
    }

    fn fan_out(inner: &LobbyInner, event: LobbyEvent, except: Option<UserId>) {
        for (user_id, conn) in &inner.connections {
            if Some(*user_id) == except {
                continue;
            }
            conn.enqueue(event.clone());
        }
    }
}
