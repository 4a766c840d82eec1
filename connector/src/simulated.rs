//! In-process stand-in for an authentication SDK
//!
//! [`SimulatedSdk`] implements [`AuthProviderFactory`] and hands out clients
//! that share one session, the way a real SDK keeps its login state globally.
//! Behaviour is scripted through [`SimulatedWalletConfig`]. Used by the
//! command-line harness and the integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use auth_connector_core::chain_id;
use auth_connector_core::error::UNRECOGNIZED_CHAIN;
use auth_connector_core::provider::{METHOD_ACCOUNTS, METHOD_CHAIN_ID, METHOD_SWITCH_CHAIN};
use auth_connector_core::{
    ActivationCancel, AuthProvider, AuthProviderFactory, AuthenticationMode, ChainId,
    ChainProvider, ConnectionStore, ConnectorActions, Error, EventListener, NetworkOptions,
    ProviderEvent, ProviderEventKind, Result, RpcRequest, SdkOptions, StateUpdate,
};
use serde_json::Value;
use tracing::debug;

/// EIP-1193 code for an unsupported method
pub const UNSUPPORTED_METHOD: i64 = 4200;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How chain ids are rendered in `eth_chainId` responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainIdFormat {
    /// `"0x89"`
    #[default]
    Hex,
    /// `"137"`
    Decimal,
    /// `137`
    Number,
}

/// Scripted behaviour of the simulated SDK
#[derive(Debug, Clone)]
pub struct SimulatedWalletConfig {
    /// Accounts exposed once logged in
    pub accounts: Vec<String>,
    /// Whether a session already exists
    pub logged_in: bool,
    /// Whether the interactive login succeeds
    pub approve_login: bool,
    /// Whether providers present themselves as an injected wallet
    pub injected: bool,
    /// Whether providers accept `wallet_switchEthereumChain`
    pub supports_chain_switch: bool,
    /// Whether the provider only exists after login
    pub lazy_provider: bool,
    /// Chain id rendering
    pub chain_id_format: ChainIdFormat,
    /// Fail `eth_accounts` with this error code
    pub fail_accounts: Option<i64>,
}

impl Default for SimulatedWalletConfig {
    fn default() -> Self {
        Self {
            accounts: vec!["0x71c7656ec7ab88b098defb751b7401b5f6d8976f".to_string()],
            logged_in: false,
            approve_login: true,
            injected: false,
            supports_chain_switch: false,
            lazy_provider: false,
            chain_id_format: ChainIdFormat::Hex,
            fail_accounts: None,
        }
    }
}

struct SdkShared {
    config: Arc<Mutex<SimulatedWalletConfig>>,
    logged_in: Arc<AtomicBool>,
    logins: AtomicU64,
    logouts: AtomicU64,
    providers: Mutex<Vec<Arc<SimulatedChainProvider>>>,
}

/// Factory for simulated SDK clients
#[derive(Clone)]
pub struct SimulatedSdk {
    shared: Arc<SdkShared>,
}

impl SimulatedSdk {
    /// Create a simulated SDK with scripted behaviour
    pub fn new(config: SimulatedWalletConfig) -> Self {
        let logged_in = Arc::new(AtomicBool::new(config.logged_in));
        Self {
            shared: Arc::new(SdkShared {
                config: Arc::new(Mutex::new(config)),
                logged_in,
                logins: AtomicU64::new(0),
                logouts: AtomicU64::new(0),
                providers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether the shared session is logged in
    pub fn is_logged_in(&self) -> bool {
        self.shared.logged_in.load(Ordering::SeqCst)
    }

    /// Force the shared session state
    pub fn set_logged_in(&self, logged_in: bool) {
        self.shared.logged_in.store(logged_in, Ordering::SeqCst);
    }

    /// Change the scripted behaviour for subsequent calls
    pub fn reconfigure(&self, f: impl FnOnce(&mut SimulatedWalletConfig)) {
        f(&mut lock(&self.shared.config));
    }

    /// Number of clients built
    pub fn clients_created(&self) -> usize {
        lock(&self.shared.providers).len()
    }

    /// Number of interactive logins performed
    pub fn logins(&self) -> u64 {
        self.shared.logins.load(Ordering::SeqCst)
    }

    /// Number of logouts performed
    pub fn logouts(&self) -> u64 {
        self.shared.logouts.load(Ordering::SeqCst)
    }

    /// Provider of the most recently built client
    pub fn last_provider(&self) -> Option<Arc<SimulatedChainProvider>> {
        lock(&self.shared.providers).last().cloned()
    }

    /// Providers of every client built, oldest first
    pub fn providers(&self) -> Vec<Arc<SimulatedChainProvider>> {
        lock(&self.shared.providers).clone()
    }
}

impl AuthProviderFactory for SimulatedSdk {
    fn create(
        &self,
        client_key: &str,
        network: &NetworkOptions,
        mode: AuthenticationMode,
        _options: &SdkOptions,
    ) -> Result<Arc<dyn AuthProvider>> {
        if client_key.trim().is_empty() {
            return Err(Error::sdk("missing client key"));
        }

        let injected = {
            let config = lock(&self.shared.config);
            config.injected && mode == AuthenticationMode::ExternalWalletBridge
        };
        let provider = Arc::new(SimulatedChainProvider::new(
            Arc::clone(&self.shared.config),
            Arc::clone(&self.shared.logged_in),
            network.chain_id,
            injected,
        ));
        lock(&self.shared.providers).push(Arc::clone(&provider));
        debug!("Simulated client created for chain {}", network.chain_id);

        Ok(Arc::new(SimulatedClient {
            shared: Arc::clone(&self.shared),
            provider,
        }))
    }
}

struct SimulatedClient {
    shared: Arc<SdkShared>,
    provider: Arc<SimulatedChainProvider>,
}

#[async_trait]
impl AuthProvider for SimulatedClient {
    async fn is_session_active(&self) -> Result<bool> {
        Ok(self.shared.logged_in.load(Ordering::SeqCst))
    }

    async fn interactive_login(&self) -> Result<()> {
        tokio::task::yield_now().await;
        if !lock(&self.shared.config).approve_login {
            return Err(Error::LoginRejected("user closed the login window".to_string()));
        }
        self.shared.logins.fetch_add(1, Ordering::SeqCst);
        self.shared.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn chain_provider(&self) -> Result<Option<Arc<dyn ChainProvider>>> {
        let lazy = lock(&self.shared.config).lazy_provider;
        if lazy && !self.shared.logged_in.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let provider: Arc<dyn ChainProvider> = self.provider.clone();
        Ok(Some(provider))
    }

    async fn logout(&self) -> Result<()> {
        self.shared.logouts.fetch_add(1, Ordering::SeqCst);
        self.shared.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Chain provider of a simulated client
pub struct SimulatedChainProvider {
    config: Arc<Mutex<SimulatedWalletConfig>>,
    logged_in: Arc<AtomicBool>,
    chain_id: Mutex<ChainId>,
    injected: bool,
    listeners: Mutex<Vec<(ProviderEventKind, EventListener)>>,
    requests: Mutex<Vec<RpcRequest>>,
}

impl SimulatedChainProvider {
    fn new(
        config: Arc<Mutex<SimulatedWalletConfig>>,
        logged_in: Arc<AtomicBool>,
        chain_id: ChainId,
        injected: bool,
    ) -> Self {
        Self {
            config,
            logged_in,
            chain_id: Mutex::new(chain_id),
            injected,
            listeners: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Deliver `event` to every listener registered for its kind
    pub fn emit(&self, event: ProviderEvent) {
        let kind = event.kind();
        let targets: Vec<EventListener> = lock(&self.listeners)
            .iter()
            .filter(|(registered, _)| *registered == kind)
            .map(|(_, listener)| listener.clone())
            .collect();

        debug!("Emitting {} to {} listener(s)", kind, targets.len());
        for listener in targets {
            listener.call(&event);
        }
    }

    /// Number of listeners currently registered
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Chain the provider currently reports
    pub fn current_chain_id(&self) -> ChainId {
        *lock(&self.chain_id)
    }

    /// Methods requested so far, in order
    pub fn requested_methods(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .map(|request| request.method.clone())
            .collect()
    }

    fn render_chain_id(&self, format: ChainIdFormat) -> Value {
        let chain_id = self.current_chain_id();
        match format {
            ChainIdFormat::Hex => Value::String(chain_id::to_hex(chain_id)),
            ChainIdFormat::Decimal => Value::String(chain_id.to_string()),
            ChainIdFormat::Number => Value::from(chain_id),
        }
    }

    fn switch_chain(&self, request: &RpcRequest) -> Result<Value> {
        let target = request
            .params
            .first()
            .and_then(|param| param.get("chainId"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::provider_rpc(-32602, "missing chainId"))?;
        let target = chain_id::parse(target)?;

        *lock(&self.chain_id) = target;
        self.emit(ProviderEvent::ChainChanged(chain_id::to_hex(target).into()));
        Ok(Value::Null)
    }
}

#[async_trait]
impl ChainProvider for SimulatedChainProvider {
    async fn request(&self, request: RpcRequest) -> Result<Value> {
        lock(&self.requests).push(request.clone());
        tokio::task::yield_now().await;

        let config = lock(&self.config).clone();
        match request.method.as_str() {
            METHOD_CHAIN_ID => Ok(self.render_chain_id(config.chain_id_format)),
            METHOD_ACCOUNTS => {
                if let Some(code) = config.fail_accounts {
                    return Err(Error::provider_rpc(code, "eth_accounts failed"));
                }
                let accounts = if self.logged_in.load(Ordering::SeqCst) {
                    config.accounts
                } else {
                    Vec::new()
                };
                Ok(Value::from(accounts))
            }
            METHOD_SWITCH_CHAIN if config.supports_chain_switch => self.switch_chain(&request),
            METHOD_SWITCH_CHAIN => Err(Error::provider_rpc(
                UNRECOGNIZED_CHAIN,
                "chain switching not supported",
            )),
            other => Err(Error::provider_rpc(
                UNSUPPORTED_METHOD,
                format!("unsupported method {}", other),
            )),
        }
    }

    fn on(&self, event: ProviderEventKind, listener: EventListener) {
        lock(&self.listeners).push((event, listener));
    }

    fn remove_listener(&self, event: ProviderEventKind, listener: &EventListener) {
        let mut listeners = lock(&self.listeners);
        if let Some(index) = listeners
            .iter()
            .position(|(kind, registered)| *kind == event && registered.same_as(listener))
        {
            listeners.remove(index);
        }
    }

    fn is_injected_wallet(&self) -> bool {
        self.injected
    }
}

/// A store call observed by [`RecordingActions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCall {
    /// `start_activation`
    StartActivation,
    /// The activation token was cancelled
    CancelActivation,
    /// `update`
    Update(StateUpdate),
    /// `reset_state`
    ResetState,
}

/// [`ConnectorActions`] wrapper over a [`ConnectionStore`] recording every call
#[derive(Clone, Default)]
pub struct RecordingActions {
    store: ConnectionStore,
    calls: Arc<Mutex<Vec<ActionCall>>>,
}

impl RecordingActions {
    /// Create a recorder over an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped store
    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<ActionCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&ActionCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    /// Every update pushed so far
    pub fn updates(&self) -> Vec<StateUpdate> {
        lock(&self.calls)
            .iter()
            .filter_map(|call| match call {
                ActionCall::Update(update) => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ActionCall) {
        lock(&self.calls).push(call);
    }
}

impl ConnectorActions for RecordingActions {
    fn start_activation(&self) -> ActivationCancel {
        self.record(ActionCall::StartActivation);
        let inner = self.store.start_activation();
        let calls = Arc::clone(&self.calls);
        ActivationCancel::new(move || {
            lock(&calls).push(ActionCall::CancelActivation);
            inner.cancel();
        })
    }

    fn update(&self, update: StateUpdate) {
        self.record(ActionCall::Update(update.clone()));
        self.store.update(update);
    }

    fn reset_state(&self) {
        self.record(ActionCall::ResetState);
        self.store.reset_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(chain_id: ChainId) -> NetworkOptions {
        NetworkOptions::new("https://rpc.example", chain_id)
    }

    #[tokio::test]
    async fn test_shared_session_across_clients() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig::default());
        let mode = AuthenticationMode::EmbeddedWallet;
        let first = sdk.create("pk", &network(1), mode, &SdkOptions::new()).unwrap();
        let second = sdk.create("pk", &network(137), mode, &SdkOptions::new()).unwrap();

        assert!(!second.is_session_active().await.unwrap());
        first.interactive_login().await.unwrap();
        assert!(second.is_session_active().await.unwrap());
        assert_eq!(sdk.logins(), 1);
        assert_eq!(sdk.clients_created(), 2);
    }

    #[tokio::test]
    async fn test_lazy_provider() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig {
            lazy_provider: true,
            ..Default::default()
        });
        let client = sdk
            .create("pk", &network(1), AuthenticationMode::EmbeddedWallet, &SdkOptions::new())
            .unwrap();

        assert!(client.chain_provider().await.unwrap().is_none());
        client.interactive_login().await.unwrap();
        assert!(client.chain_provider().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig {
            approve_login: false,
            ..Default::default()
        });
        let client = sdk
            .create("pk", &network(1), AuthenticationMode::EmbeddedWallet, &SdkOptions::new())
            .unwrap();

        let err = client.interactive_login().await.unwrap_err();
        assert!(err.is_user_rejection());
        assert!(!sdk.is_logged_in());
    }

    #[tokio::test]
    async fn test_requests() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig {
            logged_in: true,
            chain_id_format: ChainIdFormat::Decimal,
            ..Default::default()
        });
        sdk.create("pk", &network(10), AuthenticationMode::EmbeddedWallet, &SdkOptions::new())
            .unwrap();
        let provider = sdk.last_provider().unwrap();

        let chain = provider.request(RpcRequest::chain_id()).await.unwrap();
        assert_eq!(chain, Value::String("10".to_string()));

        let accounts = provider.request(RpcRequest::accounts()).await.unwrap();
        assert_eq!(accounts.as_array().map(Vec::len), Some(1));

        let err = provider.request(RpcRequest::switch_chain(1)).await.unwrap_err();
        assert!(matches!(err, Error::ProviderRpc { code: UNRECOGNIZED_CHAIN, .. }));
        assert_eq!(
            provider.requested_methods(),
            vec![METHOD_CHAIN_ID, METHOD_ACCOUNTS, METHOD_SWITCH_CHAIN]
        );
    }

    #[test]
    fn test_listener_registration() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig::default());
        sdk.create("pk", &network(1), AuthenticationMode::EmbeddedWallet, &SdkOptions::new())
            .unwrap();
        let provider = sdk.last_provider().unwrap();

        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        let listener = EventListener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        provider.on(ProviderEventKind::ChainChanged, listener.clone());
        provider.emit(ProviderEvent::ChainChanged(auth_connector_core::RawChainId::Number(5)));
        provider.emit(ProviderEvent::AccountsChanged(Vec::new()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        provider.remove_listener(ProviderEventKind::ChainChanged, &EventListener::new(|_| {}));
        assert_eq!(provider.listener_count(), 1);

        provider.remove_listener(ProviderEventKind::ChainChanged, &listener);
        provider.remove_listener(ProviderEventKind::ChainChanged, &listener);
        assert_eq!(provider.listener_count(), 0);
    }

    #[test]
    fn test_injected_only_in_bridge_mode() {
        let sdk = SimulatedSdk::new(SimulatedWalletConfig {
            injected: true,
            ..Default::default()
        });
        sdk.create("pk", &network(1), AuthenticationMode::EmbeddedWallet, &SdkOptions::new())
            .unwrap();
        assert!(!sdk.last_provider().unwrap().is_injected_wallet());

        sdk.create(
            "pk",
            &network(1),
            AuthenticationMode::ExternalWalletBridge,
            &SdkOptions::new(),
        )
        .unwrap();
        assert!(sdk.last_provider().unwrap().is_injected_wallet());
    }

    #[test]
    fn test_recording_actions() {
        let actions = RecordingActions::new();
        let token = actions.start_activation();
        token.cancel();
        actions.update(StateUpdate::chain_id(1));
        actions.reset_state();

        assert_eq!(
            actions.calls(),
            vec![
                ActionCall::StartActivation,
                ActionCall::CancelActivation,
                ActionCall::Update(StateUpdate::chain_id(1)),
                ActionCall::ResetState,
            ]
        );
        assert!(!actions.store().snapshot().is_connected());
    }
}
