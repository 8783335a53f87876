// Cancellable delayed game start, owned by the lobby that armed it.

use std::sync::Arc;
use std::time::Duration;

use super::connection::CancelHandle;
use super::state::LobbyState;
use crate::session::SessionHandoff;

/// A running countdown. The owning lobby keeps exactly one of these inside
/// its locked state; cancelling it (readiness change, lobby emptied) stops
/// the task before it can fire.
pub(crate) struct Countdown {
    cancel: CancelHandle,
}

impl Countdown {
    /// Arms a countdown that runs the session handoff after `delay` unless
    /// cancelled first.
    pub(crate) fn arm(
        lobby: Arc<LobbyState>,
        handoff: Arc<SessionHandoff>,
        delay: Duration,
    ) -> Self {
        let cancel = CancelHandle::new();
        let mut cancelled = cancel.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    lobby.countdown_fired(handoff).await;
                }
                _ = async { cancelled.wait_for(|flag| *flag).await.map(|_| ()) } => {}
            }
        });
        Self { cancel }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }
}
