// Per-participant plumbing between a lobby and one live transport.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use parlor_shared::{LobbyEvent, UserId};

/// Depth of each participant's outbound queue. A broadcast finding the
/// queue full is dropped for that recipient rather than stalling the lobby.
pub const OUTBOUND_QUEUE_DEPTH: usize = 10;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Terminates a connection's pump pair. Cloneable; cancelling twice is a
/// no-op, and both pumps observe the same signal.
#[derive(Clone)]
pub struct CancelHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            signal: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// One connected participant: the bounded outbound queue feeding its write
/// pump and the cancellation handle shared by both pumps. Owned by the
/// lobby that registered it until it is removed or migrated into a session.
pub struct LobbyConnection {
    id: u64,
    user_id: UserId,
    queue: mpsc::Sender<LobbyEvent>,
    cancel: CancelHandle,
}

impl LobbyConnection {
    /// Builds the connection plus the receiving half consumed by the write
    /// pump.
    pub fn new(user_id: UserId) -> (Self, mpsc::Receiver<LobbyEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let conn = Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            user_id,
            queue: tx,
            cancel: CancelHandle::new(),
        };
        (conn, rx)
    }

    /// Process-unique id distinguishing successive connections of the same
    /// user, so a stale pump can never unregister its replacement.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Best-effort enqueue. A full or closed queue drops the event.
    pub fn enqueue(&self, event: LobbyEvent) -> bool {
        match self.queue.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(user_id = %self.user_id, error = %err, "dropping outbound lobby event");
                false
            }
        }
    }

    /// Cancels both pump tasks. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_drops_the_overflowing_event() {
        let (conn, mut rx) = LobbyConnection::new(UserId::random());
        for _ in 0..OUTBOUND_QUEUE_DEPTH {
            assert!(conn.enqueue(LobbyEvent::CountdownCancelled));
        }
        assert!(!conn.enqueue(LobbyEvent::CountdownCancelled));

        // the first ten are still intact
        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, OUTBOUND_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_observable() {
        let (conn, _rx) = LobbyConnection::new(UserId::random());
        let handle = conn.cancel_handle();
        assert!(!handle.is_cancelled());
        conn.cancel();
        conn.cancel();
        assert!(handle.is_cancelled());

        let mut sub = handle.subscribe();
        sub.wait_for(|cancelled| *cancelled).await.unwrap();
    }

    #[test]
    fn connection_ids_are_unique() {
        let (a, _ra) = LobbyConnection::new(UserId::random());
        let (b, _rb) = LobbyConnection::new(UserId::random());
        assert_ne!(a.id(), b.id());
    }
}
