//! The shared connection-state store contract
//!
//! The wallet-aggregation host owns the store that UI code reads chain id and
//! accounts from. Connectors only ever write to it through
//! [`ConnectorActions`]. [`ConnectionStore`] is an in-memory implementation
//! with the host's activation-token semantics, used by the command-line harness
//! and by tests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::types::{ConnectionState, StateUpdate};

/// Write access to the shared connection-state store
pub trait ConnectorActions: Send + Sync {
    /// Mark an activation as in flight.
    ///
    /// The returned token reverts the marker when cancelled, unless the store
    /// has moved on since.
    fn start_activation(&self) -> ActivationCancel;

    /// Merge a partial update into the store
    fn update(&self, update: StateUpdate);

    /// Return the store to the disconnected state
    fn reset_state(&self);
}

/// One-shot token returned by [`ConnectorActions::start_activation`]
#[must_use = "an activation token must be cancelled on failure"]
pub struct ActivationCancel {
    cancel: Box<dyn FnOnce() + Send>,
}

impl ActivationCancel {
    /// Wrap the store's revert action
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// A token whose cancellation does nothing
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Revert the activation marker
    pub fn cancel(self) {
        (self.cancel)()
    }
}

impl fmt::Debug for ActivationCancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationCancel").finish_non_exhaustive()
    }
}

struct StoreShared {
    state: watch::Sender<ConnectionState>,
    // Bumped by every write; a cancel token only applies if it still matches.
    nonce: AtomicU64,
}

/// In-memory connection-state store
#[derive(Clone)]
pub struct ConnectionStore {
    shared: Arc<StoreShared>,
}

impl ConnectionStore {
    /// Create an empty, disconnected store
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            shared: Arc::new(StoreShared {
                state,
                nonce: AtomicU64::new(0),
            }),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// Receive every subsequent state change
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    fn bump(&self) -> u64 {
        self.shared.nonce.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for ConnectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStore")
            .field("state", &*self.shared.state.borrow())
            .field("nonce", &self.shared.nonce.load(Ordering::SeqCst))
            .finish()
    }
}

impl ConnectorActions for ConnectionStore {
    fn start_activation(&self) -> ActivationCancel {
        let mut issued = 0;
        self.shared.state.send_modify(|state| {
            issued = self.bump();
            *state = ConnectionState {
                activating: true,
                ..ConnectionState::default()
            };
        });
        debug!("Activation {} started", issued);

        let shared = Arc::clone(&self.shared);
        ActivationCancel::new(move || {
            let reverted = shared.state.send_if_modified(|state| {
                if shared.nonce.load(Ordering::SeqCst) != issued {
                    return false;
                }
                state.activating = false;
                true
            });
            debug!("Activation {} cancelled (reverted: {})", issued, reverted);
        })
    }

    fn update(&self, update: StateUpdate) {
        self.shared.state.send_modify(|state| {
            self.bump();
            if let Some(chain_id) = update.chain_id {
                state.chain_id = Some(chain_id);
            }
            if let Some(accounts) = update.accounts {
                state.accounts = accounts;
            }
            if state.activating && state.chain_id.is_some() && !state.accounts.is_empty() {
                state.activating = false;
            }
            debug!(
                "Store updated: chain {:?}, {} account(s)",
                state.chain_id,
                state.accounts.len()
            );
        });
    }

    fn reset_state(&self) {
        self.shared.state.send_modify(|state| {
            self.bump();
            *state = ConnectionState::default();
        });
        debug!("Store reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_merges_fields() {
        let store = ConnectionStore::new();
        store.update(StateUpdate::chain_id(1));
        store.update(StateUpdate::accounts(vec!["0xabc".to_string()]));

        let state = store.snapshot();
        assert_eq!(state.chain_id, Some(1));
        assert_eq!(state.accounts, vec!["0xabc".to_string()]);
        assert!(state.is_connected());

        store.update(StateUpdate::chain_id(137));
        let state = store.snapshot();
        assert_eq!(state.chain_id, Some(137));
        assert_eq!(state.accounts.len(), 1);
    }

    #[test]
    fn test_activation_cleared_by_complete_update() {
        let store = ConnectionStore::new();
        let _token = store.start_activation();
        assert!(store.snapshot().activating);

        store.update(StateUpdate::chain_id(1));
        assert!(store.snapshot().activating);

        store.update(StateUpdate::connected(1, vec!["0xabc".to_string()]));
        assert!(!store.snapshot().activating);
    }

    #[test]
    fn test_cancel_reverts_activation() {
        let store = ConnectionStore::new();
        store.update(StateUpdate::connected(1, vec!["0xabc".to_string()]));

        let token = store.start_activation();
        let state = store.snapshot();
        assert!(state.activating);
        assert!(!state.is_connected());

        token.cancel();
        assert_eq!(store.snapshot(), ConnectionState::default());
    }

    #[test]
    fn test_stale_cancel_is_ignored() {
        let store = ConnectionStore::new();
        let first = store.start_activation();
        let _second = store.start_activation();

        first.cancel();
        assert!(store.snapshot().activating);
    }

    #[test]
    fn test_cancel_after_update_is_ignored() {
        let store = ConnectionStore::new();
        let token = store.start_activation();
        store.update(StateUpdate::connected(5, vec!["0xdef".to_string()]));

        token.cancel();
        let state = store.snapshot();
        assert_eq!(state.chain_id, Some(5));
        assert!(!state.activating);
    }

    #[test]
    fn test_reset() {
        let store = ConnectionStore::new();
        store.update(StateUpdate::connected(1, vec!["0xabc".to_string()]));
        store.reset_state();
        assert_eq!(store.snapshot(), ConnectionState::default());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = ConnectionStore::new();
        let mut rx = store.subscribe();

        store.update(StateUpdate::chain_id(10));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().chain_id, Some(10));
    }
}
