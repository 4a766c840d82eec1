//! Provider event bridge
//!
//! Keeps the shared connection-state store in sync with whatever the live
//! chain provider reports, so the connector never has to poll. The bridge owns
//! one listener per event kind for its whole lifetime; attaching and detaching
//! always use those same values, which is what makes removal work.

use std::fmt;
use std::sync::Arc;

use auth_connector_core::chain_id;
use auth_connector_core::{
    ChainProvider, ConnectInfo, ConnectorActions, Error, EventListener, ProviderEvent,
    ProviderEventKind, ProviderRpcError, RawChainId, StateUpdate,
};
use tracing::{debug, warn};

/// Callback receiving errors the connector cannot return to a caller
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

struct BridgeHandlers {
    actions: Arc<dyn ConnectorActions>,
    on_error: Option<ErrorHandler>,
}

impl BridgeHandlers {
    fn handle(&self, event: &ProviderEvent) {
        match event {
            ProviderEvent::Connect(info) => self.on_connect(info),
            ProviderEvent::Disconnect(error) => self.on_disconnect(error.as_ref()),
            ProviderEvent::ChainChanged(chain_id) => self.on_chain_changed(chain_id),
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts),
        }
    }

    fn on_connect(&self, info: &ConnectInfo) {
        debug!("Provider connected to chain {}", info.chain_id);
        self.update_chain_id(&info.chain_id);
    }

    fn on_disconnect(&self, error: Option<&ProviderRpcError>) {
        debug!("Provider disconnected");
        self.actions.reset_state();
        if let Some(error) = error {
            self.report(&Error::provider_rpc(error.code, error.message.clone()));
        }
    }

    fn on_chain_changed(&self, chain_id: &RawChainId) {
        debug!("Provider switched to chain {}", chain_id);
        self.update_chain_id(chain_id);
    }

    fn on_accounts_changed(&self, accounts: &[String]) {
        if accounts.is_empty() {
            debug!("Provider exposes no accounts, treating as disconnect");
            self.actions.reset_state();
        } else {
            debug!("Provider accounts changed ({} account(s))", accounts.len());
            self.actions.update(StateUpdate::accounts(accounts.to_vec()));
        }
    }

    fn update_chain_id(&self, raw: &RawChainId) {
        match chain_id::normalize(raw) {
            Ok(chain_id) => self.actions.update(StateUpdate::chain_id(chain_id)),
            Err(e) => {
                warn!("Ignoring provider chain id: {}", e);
                self.report(&e);
            }
        }
    }

    fn report(&self, error: &Error) {
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }
}

/// Translates provider events into store updates
pub struct ProviderEventBridge {
    handlers: Arc<BridgeHandlers>,
    listeners: Vec<(ProviderEventKind, EventListener)>,
}

impl ProviderEventBridge {
    /// Create a bridge writing into `actions`, reporting to `on_error`
    pub fn new(actions: Arc<dyn ConnectorActions>, on_error: Option<ErrorHandler>) -> Self {
        let handlers = Arc::new(BridgeHandlers { actions, on_error });

        let listeners = ProviderEventKind::ALL
            .iter()
            .map(|&kind| {
                let handlers = Arc::clone(&handlers);
                let listener = EventListener::new(move |event: &ProviderEvent| {
                    if event.kind() == kind {
                        handlers.handle(event);
                    }
                });
                (kind, listener)
            })
            .collect();

        Self {
            handlers,
            listeners,
        }
    }

    /// Register all four listeners on `provider`
    pub fn attach(&self, provider: &dyn ChainProvider) {
        for (kind, listener) in &self.listeners {
            provider.on(*kind, listener.clone());
        }
    }

    /// Remove all four listeners from `provider`
    pub fn detach(&self, provider: &dyn ChainProvider) {
        for (kind, listener) in &self.listeners {
            provider.remove_listener(*kind, listener);
        }
    }

    /// Handle an event directly, as if `provider` had emitted it
    pub fn dispatch(&self, event: &ProviderEvent) {
        self.handlers.handle(event);
    }

    /// Listener registered for `kind`
    pub fn listener(&self, kind: ProviderEventKind) -> Option<&EventListener> {
        self.listeners
            .iter()
            .find(|(registered, _)| *registered == kind)
            .map(|(_, listener)| listener)
    }
}

impl fmt::Debug for ProviderEventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEventBridge")
            .field("listeners", &self.listeners)
            .field("has_error_handler", &self.handlers.on_error.is_some())
            .finish()
    }
}
