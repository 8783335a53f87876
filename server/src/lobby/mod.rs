// Lobby-side building blocks: per-connection plumbing, per-lobby state,
// the countdown timer, and the process-wide registry.

pub mod connection;
mod countdown;
pub mod manager;
pub mod state;

pub use connection::{CancelHandle, LobbyConnection, OUTBOUND_QUEUE_DEPTH};
pub use manager::LobbyManager;
pub use state::LobbyState;
