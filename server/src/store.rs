// Persistence boundary for lobbies and their participants.
//
// The production deployment backs this with a database; the in-memory
// implementation keeps development and tests self-contained. Membership in
// the store is independent of live connections: a user can be a persisted
// participant without being connected right now.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use parlor_shared::{LobbyId, LobbyRecord, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lobby not found")]
    LobbyNotFound,
    #[error("user is already a participant of that lobby")]
    AlreadyParticipant,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A participant row: lobby membership plus the seat number assigned on join.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub user_id: UserId,
    pub seat_number: u32,
}

#[async_trait]
pub trait LobbyStore: Send + Sync {
    async fn create_lobby(&self, record: LobbyRecord) -> Result<(), StoreError>;
    async fn get_lobby(&self, lobby_id: LobbyId) -> Result<LobbyRecord, StoreError>;
    async fn list_lobbies(&self) -> Result<Vec<LobbyRecord>, StoreError>;
    async fn delete_lobby(&self, lobby_id: LobbyId) -> Result<(), StoreError>;

    async fn insert_participant(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
        seat_number: u32,
    ) -> Result<(), StoreError>;
    async fn is_user_in_lobby(&self, lobby_id: LobbyId, user_id: UserId)
        -> Result<bool, StoreError>;
    /// Best-effort removal; removing an absent participant is not an error.
    async fn remove_user_from_lobby(
        &self,
        user_id: UserId,
        lobby_id: LobbyId,
    ) -> Result<(), StoreError>;
    async fn participants(&self, lobby_id: LobbyId) -> Result<Vec<ParticipantRecord>, StoreError>;
}

/// In-memory store. One mutex over both maps; every operation is a short
/// lookup or insert.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    lobbies: HashMap<LobbyId, LobbyRecord>,
    participants: HashMap<LobbyId, Vec<ParticipantRecord>>,
}

#[async_trait]
impl LobbyStore for MemoryStore {
    async fn create_lobby(&self, record: LobbyRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.participants.entry(record.id).or_default();
        inner.lobbies.insert(record.id, record);
        Ok(())
    }

    async fn get_lobby(&self, lobby_id: LobbyId) -> Result<LobbyRecord, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .lobbies
            .get(&lobby_id)
            .cloned()
            .ok_or(StoreError::LobbyNotFound)
    }

    async fn list_lobbies(&self) -> Result<Vec<LobbyRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.lobbies.values().cloned().collect())
    }

    async fn delete_lobby(&self, lobby_id: LobbyId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.participants.remove(&lobby_id);
        inner
            .lobbies
            .remove(&lobby_id)
            .map(|_| ())
            .ok_or(StoreError::LobbyNotFound)
    }

    async fn insert_participant(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
        seat_number: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.lobbies.contains_key(&lobby_id) {
            return Err(StoreError::LobbyNotFound);
        }
        let rows = inner.participants.entry(lobby_id).or_default();
        if rows.iter().any(|row| row.user_id == user_id) {
            return Err(StoreError::AlreadyParticipant);
        }
        rows.push(ParticipantRecord {
            user_id,
            seat_number,
        });
        Ok(())
    }

    async fn is_user_in_lobby(
        &self,
        lobby_id: LobbyId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .participants
            .get(&lobby_id)
            .is_some_and(|rows| rows.iter().any(|row| row.user_id == user_id)))
    }

    async fn remove_user_from_lobby(
        &self,
        user_id: UserId,
        lobby_id: LobbyId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(rows) = inner.participants.get_mut(&lobby_id) {
            rows.retain(|row| row.user_id != user_id);
        }
        Ok(())
    }

    async fn participants(&self, lobby_id: LobbyId) -> Result<Vec<ParticipantRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .participants
            .get(&lobby_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_shared::{GameMode, HouseRules, LobbyType};

    fn record() -> LobbyRecord {
        LobbyRecord {
            id: LobbyId::random(),
            host_user_id: UserId::random(),
            lobby_type: LobbyType::Private,
            game_mode: GameMode::HeadToHead,
            house_rules: HouseRules::default(),
        }
    }

    #[tokio::test]
    async fn membership_lifecycle() {
        let store = MemoryStore::default();
        let rec = record();
        let user = UserId::random();
        store.create_lobby(rec.clone()).await.unwrap();

        assert!(!store.is_user_in_lobby(rec.id, user).await.unwrap());
        store.insert_participant(rec.id, user, 3).await.unwrap();
        assert!(store.is_user_in_lobby(rec.id, user).await.unwrap());

        let rows = store.participants(rec.id).await.unwrap();
        assert_eq!(
            rows,
            vec![ParticipantRecord {
                user_id: user,
                seat_number: 3
            }]
        );

        store.remove_user_from_lobby(user, rec.id).await.unwrap();
        assert!(!store.is_user_in_lobby(rec.id, user).await.unwrap());
        // removing again is not an error
        store.remove_user_from_lobby(user, rec.id).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_participant_is_a_conflict() {
        let store = MemoryStore::default();
        let rec = record();
        let user = UserId::random();
        store.create_lobby(rec.clone()).await.unwrap();
        store.insert_participant(rec.id, user, 1).await.unwrap();
        assert!(matches!(
            store.insert_participant(rec.id, user, 2).await,
            Err(StoreError::AlreadyParticipant)
        ));
    }

    #[tokio::test]
    async fn unknown_lobby_errors() {
        let store = MemoryStore::default();
        let missing = LobbyId::random();
        assert!(matches!(
            store.get_lobby(missing).await,
            Err(StoreError::LobbyNotFound)
        ));
        assert!(matches!(
            store.delete_lobby(missing).await,
            Err(StoreError::LobbyNotFound)
        ));
        assert!(matches!(
            store
                .insert_participant(missing, UserId::random(), 1)
                .await,
            Err(StoreError::LobbyNotFound)
        ));
    }
}
