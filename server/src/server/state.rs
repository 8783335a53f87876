// Shared application state exposed to handlers.

use std::sync::Arc;

use crate::auth::{InsecureUuidVerifier, TokenVerifier};
use crate::config::Config;
use crate::lobby::LobbyManager;
use crate::session::{LocalSessionFactory, SessionFactory, SessionHandoff};
use crate::store::{LobbyStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LobbyManager>,
    pub store: Arc<dyn LobbyStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub handoff: Arc<SessionHandoff>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the default in-process implementations around `config`.
    pub fn new(config: Config) -> Self {
        Self::with_parts(
            config,
            Arc::new(MemoryStore::default()),
            Arc::new(LocalSessionFactory::default()),
            Arc::new(InsecureUuidVerifier),
        )
    }

    /// Assembles state from explicit collaborators; used by tests and by
    /// deployments that bring their own store, rules engine, or verifier.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn LobbyStore>,
        factory: Arc<dyn SessionFactory>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        let handoff = SessionHandoff::new(Arc::clone(&store), factory);
        Self {
            manager: Arc::new(LobbyManager::new()),
            store,
            verifier,
            handoff,
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
