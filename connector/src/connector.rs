//! Connection lifecycle
//!
//! [`AuthConnector`] is the connector a wallet-aggregation host drives. It
//! coordinates the host's connection-state store, the authentication SDK's
//! session and the chain provider's event stream:
//!
//! - `connect_eagerly` resumes an existing SDK session without user interaction
//! - `activate` logs in if needed, binds to the requested chain and publishes
//!   chain id and accounts in one store write
//! - `deactivate` resets the store, unsubscribes from the provider and logs out
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use auth_connector::prelude::*;
//! use auth_connector::simulated::{SimulatedSdk, SimulatedWalletConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let store = ConnectionStore::new();
//!     let config = ConnectorConfig::builder()
//!         .with_client_key("pk_live_123")
//!         .with_network(NetworkOptions::new("https://rpc.example", 1))
//!         .build();
//!
//!     let connector = AuthConnector::new(ConnectorArgs {
//!         actions: Arc::new(store.clone()),
//!         factory: Arc::new(SimulatedSdk::new(SimulatedWalletConfig::default())),
//!         config,
//!         on_error: None,
//!     })?;
//!
//!     connector.connect_eagerly().await?;
//!     if !store.snapshot().is_connected() {
//!         connector.activate(None).await?;
//!     }
//!
//!     // Switch networks
//!     let polygon = ChainParameters::new(137, "https://poly.example");
//!     connector.activate(Some(polygon.into())).await?;
//!
//!     connector.deactivate().await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use auth_connector_core::chain_id;
use auth_connector_core::provider::{METHOD_ACCOUNTS, METHOD_CHAIN_ID};
use auth_connector_core::{
    ActivationPolicy, AuthProvider, AuthProviderFactory, ChainId, ChainProvider,
    ConnectorActions, ConnectorConfig, ConnectorStatus, DesiredChain, Error, NetworkOptions,
    RawChainId, Result, RpcRequest, StateUpdate,
};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::bridge::{ErrorHandler, ProviderEventBridge};
use crate::client::AuthClientManager;

/// Everything a connector is constructed from
pub struct ConnectorArgs {
    /// The host's connection-state store
    pub actions: Arc<dyn ConnectorActions>,
    /// Builds SDK clients
    pub factory: Arc<dyn AuthProviderFactory>,
    /// Client key, default network and policies
    pub config: ConnectorConfig,
    /// Receives errors that cannot be returned to a caller
    pub on_error: Option<ErrorHandler>,
}

/// Mutable connector state. Only locked for short, non-suspending sections.
struct Session {
    clients: AuthClientManager,
    provider: Option<Arc<dyn ChainProvider>>,
    // Provider instance the bridge listeners are attached to.
    listening: Option<Arc<dyn ChainProvider>>,
    status: ConnectorStatus,
}

/// Connector binding an authentication SDK to a connection-state store
pub struct AuthConnector {
    actions: Arc<dyn ConnectorActions>,
    config: ConnectorConfig,
    bridge: ProviderEventBridge,
    session: Mutex<Session>,
    gate: Mutex<()>,
}

impl AuthConnector {
    /// Create a connector and build its first SDK client.
    ///
    /// Fails if the configuration is invalid or the SDK rejects construction.
    pub fn new(args: ConnectorArgs) -> Result<Self> {
        let ConnectorArgs {
            actions,
            factory,
            config,
            on_error,
        } = args;
        config.validate()?;

        let mut clients = AuthClientManager::new(
            factory,
            config.client_key.clone(),
            config.mode,
            config.sdk_options.clone(),
            config.network.clone(),
        );
        clients.ensure_client(None)?;

        Ok(Self {
            bridge: ProviderEventBridge::new(Arc::clone(&actions), on_error),
            actions,
            config,
            session: Mutex::new(Session {
                clients,
                provider: None,
                listening: None,
                status: ConnectorStatus::Idle,
            }),
            gate: Mutex::new(()),
        })
    }

    /// Resume an existing SDK session, if there is one.
    ///
    /// Without a session this returns `Ok(())` without touching the store.
    #[instrument(skip(self))]
    pub async fn connect_eagerly(&self) -> Result<()> {
        let client = {
            let mut session = self.session.lock().await;
            session.clients.ensure_client(None)?.client
        };

        if !self.session_active(client.as_ref()).await {
            debug!("No existing session to resume");
            return Ok(());
        }

        info!("Resuming existing session");
        self.activate(None).await
    }

    /// Connect, optionally to a specific chain.
    ///
    /// On failure the store's activation token is cancelled, the provider is
    /// released and the error is returned unchanged.
    #[instrument(
        skip(self, desired),
        fields(attempt = %Uuid::new_v4(), chain = ?desired.as_ref().map(DesiredChain::chain_id))
    )]
    pub async fn activate(&self, desired: Option<DesiredChain>) -> Result<()> {
        let _gate = self.acquire_gate().await?;
        let cancel = self.actions.start_activation();
        self.set_status(ConnectorStatus::Activating).await;

        match self.run_activation(desired.as_ref()).await {
            Ok(Some(update)) => {
                drop(cancel);
                info!(
                    "Activated on chain {:?} with {} account(s)",
                    update.chain_id,
                    update.accounts.as_ref().map_or(0, Vec::len)
                );
                self.actions.update(update);
                self.set_status(ConnectorStatus::Active).await;
                Ok(())
            }
            Ok(None) => {
                info!("Provider exposes no accounts, treating as disconnect");
                cancel.cancel();
                self.actions.reset_state();
                self.set_status(ConnectorStatus::Idle).await;
                Ok(())
            }
            Err(e) => {
                warn!("Activation failed: {}", e);
                cancel.cancel();
                {
                    let mut session = self.session.lock().await;
                    self.release_provider(&mut session);
                    session.status = ConnectorStatus::Idle;
                }
                Err(e)
            }
        }
    }

    /// Disconnect: reset the store, unsubscribe and log out of the SDK.
    ///
    /// Safe to call in any state; a failing logout is logged, not returned.
    #[instrument(skip(self))]
    pub async fn deactivate(&self) -> Result<()> {
        self.actions.reset_state();

        let client = {
            let mut session = self.session.lock().await;
            session.status = ConnectorStatus::Deactivating;
            self.release_provider(&mut session);
            session.clients.current()
        };

        if let Some(client) = client {
            if let Err(e) = client.logout().await {
                warn!("Logout failed: {}", e);
            }
        }

        let mut session = self.session.lock().await;
        session.clients.discard();
        session.status = ConnectorStatus::Idle;
        info!("Deactivated");
        Ok(())
    }

    /// Current lifecycle status
    pub async fn status(&self) -> ConnectorStatus {
        self.session.lock().await.status
    }

    /// The chain provider in use, if any
    pub async fn provider(&self) -> Option<Arc<dyn ChainProvider>> {
        self.session.lock().await.provider.clone()
    }

    /// Whether the bridge is subscribed to a provider
    pub async fn is_listening(&self) -> bool {
        self.session.lock().await.listening.is_some()
    }

    /// Chain id the SDK client is bound to
    pub async fn bound_chain_id(&self) -> Option<ChainId> {
        self.session.lock().await.clients.bound_chain_id()
    }

    /// Number of SDK clients built over the connector's lifetime
    pub async fn clients_created(&self) -> u64 {
        self.session.lock().await.clients.clients_created()
    }

    /// Configuration the connector was built with
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    async fn run_activation(&self, desired: Option<&DesiredChain>) -> Result<Option<StateUpdate>> {
        let bound = {
            let mut session = self.session.lock().await;
            let target = self.resolve_network(desired, session.clients.bound_network())?;
            let bound = session.clients.ensure_client(target.as_ref())?;
            if bound.created {
                self.release_provider(&mut session);
            }
            bound
        };

        if !self.session_active(bound.client.as_ref()).await {
            info!("No active session, starting interactive login");
            bound.client.interactive_login().await?;
        }

        let provider = bound.chain_provider().await?;
        {
            let mut session = self.session.lock().await;
            self.attach_listeners(&mut session, &provider);
            session.provider = Some(Arc::clone(&provider));
        }

        if let Some(desired) = desired.filter(|_| provider.is_injected_wallet()) {
            self.request_chain_switch(provider.as_ref(), desired.chain_id())
                .await;
        }

        let (chain_id, accounts) = futures::try_join!(
            provider.request(RpcRequest::chain_id()),
            provider.request(RpcRequest::accounts()),
        )?;
        let chain_id = decode_chain_id(chain_id)?;
        let accounts = decode_accounts(accounts)?;

        if accounts.is_empty() {
            return Ok(None);
        }
        Ok(Some(StateUpdate::connected(chain_id, accounts)))
    }

    /// Network a desired chain maps to; `None` keeps whatever is bound
    fn resolve_network(
        &self,
        desired: Option<&DesiredChain>,
        bound: Option<&NetworkOptions>,
    ) -> Result<Option<NetworkOptions>> {
        match desired {
            None => Ok(None),
            Some(DesiredChain::Parameters(params)) => params.network().map(Some),
            Some(DesiredChain::Id(chain_id)) => match bound {
                Some(bound) if bound.chain_id == *chain_id => Ok(Some(bound.clone())),
                _ => self
                    .config
                    .network_for(*chain_id)
                    .map(Some)
                    .ok_or(Error::UnknownChain(*chain_id)),
            },
        }
    }

    async fn session_active(&self, client: &dyn AuthProvider) -> bool {
        match client.is_session_active().await {
            Ok(active) => active,
            Err(e) => {
                warn!("Session check failed, assuming no session: {}", e);
                false
            }
        }
    }

    async fn request_chain_switch(&self, provider: &dyn ChainProvider, chain_id: ChainId) {
        match provider.request(RpcRequest::switch_chain(chain_id)).await {
            Ok(_) => debug!("Injected wallet switched to chain {}", chain_id),
            Err(e) => warn!("wallet_switchEthereumChain to {} failed: {}", chain_id, e),
        }
    }

    fn attach_listeners(&self, session: &mut Session, provider: &Arc<dyn ChainProvider>) {
        match &session.listening {
            Some(current) if Arc::ptr_eq(current, provider) => {
                debug!("Listeners already attached");
                return;
            }
            Some(stale) => {
                debug!("Provider replaced, moving listeners");
                self.bridge.detach(stale.as_ref());
            }
            None => {}
        }

        self.bridge.attach(provider.as_ref());
        session.listening = Some(Arc::clone(provider));
    }

    fn release_provider(&self, session: &mut Session) {
        if let Some(provider) = session.listening.take() {
            self.bridge.detach(provider.as_ref());
        }
        session.provider = None;
    }

    async fn acquire_gate(&self) -> Result<Option<MutexGuard<'_, ()>>> {
        match self.config.activation_policy {
            ActivationPolicy::Overlap => Ok(None),
            ActivationPolicy::Serialize => Ok(Some(self.gate.lock().await)),
            ActivationPolicy::Reject => self
                .gate
                .try_lock()
                .map(Some)
                .map_err(|_| Error::ActivationInProgress),
        }
    }

    async fn set_status(&self, status: ConnectorStatus) {
        self.session.lock().await.status = status;
    }
}

impl fmt::Debug for AuthConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConnector")
            .field("mode", &self.config.mode)
            .field("network", &self.config.network)
            .field("activation_policy", &self.config.activation_policy)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

fn decode_chain_id(value: Value) -> Result<ChainId> {
    let raw: RawChainId = serde_json::from_value(value)
        .map_err(|e| Error::invalid_response(METHOD_CHAIN_ID, e.to_string()))?;
    chain_id::normalize(&raw)
}

fn decode_accounts(value: Value) -> Result<Vec<String>> {
    serde_json::from_value(value).map_err(|e| Error::invalid_response(METHOD_ACCOUNTS, e.to_string()))
}
