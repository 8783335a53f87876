// Process-wide registry of live lobby states.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use parlor_shared::{LobbyId, LobbyRecord};

use super::state::LobbyState;

/// Maps lobby ids to their live in-memory state. Starts empty and is
/// populated lazily by the connection-accept path; entries are never
/// evicted. Operations on different lobbies never contend: the registry
/// mutex only guards the map itself.
#[derive(Default)]
pub struct LobbyManager {
    lobbies: Mutex<HashMap<LobbyId, Arc<LobbyState>>>,
}

impl LobbyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lobby's live state, creating it from the persisted
    /// record on first access. Concurrent first access for the same id
    /// yields exactly one instance.
    pub async fn get_or_create(&self, record: &LobbyRecord) -> Arc<LobbyState> {
        let mut lobbies = self.lobbies.lock().await;
        Arc::clone(lobbies.entry(record.id).or_insert_with(|| {
            LobbyState::new(record.id, record.host_user_id, record.house_rules.clone())
        }))
    }

    /// Looks a lobby up without creating it.
    pub async fn get(&self, lobby_id: LobbyId) -> Option<Arc<LobbyState>> {
        self.lobbies.lock().await.get(&lobby_id).map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_shared::{GameMode, HouseRules, LobbyType, UserId};

    fn record() -> LobbyRecord {
        LobbyRecord {
            id: LobbyId::random(),
            host_user_id: UserId::random(),
            lobby_type: LobbyType::Public,
            game_mode: GameMode::GroupOf4,
            house_rules: HouseRules::default(),
        }
    }

    #[tokio::test]
    async fn concurrent_first_access_yields_one_instance() {
        let manager = Arc::new(LobbyManager::new());
        let rec = record();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = Arc::clone(&manager);
            let rec = rec.clone();
            handles.push(tokio::spawn(
                async move { manager.get_or_create(&rec).await },
            ));
        }

        let mut states = Vec::new();
        for handle in handles {
            states.push(handle.await.unwrap());
        }
        for state in &states[1..] {
            assert!(Arc::ptr_eq(&states[0], state));
        }
    }

    #[tokio::test]
    async fn distinct_lobbies_get_distinct_states() {
        let manager = LobbyManager::new();
        let a = manager.get_or_create(&record()).await;
        let b = manager.get_or_create(&record()).await;
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(manager.get(a.lobby_id).await.is_some());
        assert!(manager.get(LobbyId::random()).await.is_none());
    }
}
