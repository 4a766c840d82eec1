//! Authentication client management
//!
//! One SDK client is current at a time, bound to one network. A new client is
//! only built when the caller asks for a different chain id than the current
//! one is bound to; a request for the chain already in use reuses the live
//! client so an active session is not torn down.

use std::fmt;
use std::sync::Arc;

use auth_connector_core::{
    AuthProvider, AuthProviderFactory, AuthenticationMode, ChainId, ChainProvider, Error,
    NetworkOptions, Result, SdkOptions,
};
use tracing::info;

/// Client handed out by [`AuthClientManager::ensure_client`]
#[derive(Clone)]
pub struct BoundClient {
    /// The SDK client
    pub client: Arc<dyn AuthProvider>,
    /// Network it was built for
    pub network: NetworkOptions,
    /// Whether this call built it
    pub created: bool,
}

impl BoundClient {
    /// Ask the client for its chain provider.
    ///
    /// Depending on the SDK this may resolve immediately or only after a
    /// login; an absent provider is an error.
    pub async fn chain_provider(&self) -> Result<Arc<dyn ChainProvider>> {
        self.client
            .chain_provider()
            .await?
            .ok_or(Error::ProviderUnavailable)
    }
}

impl fmt::Debug for BoundClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundClient")
            .field("network", &self.network)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

/// Owns creation and recreation of the SDK client
pub struct AuthClientManager {
    factory: Arc<dyn AuthProviderFactory>,
    client_key: String,
    mode: AuthenticationMode,
    sdk_options: SdkOptions,
    default_network: NetworkOptions,
    bound_network: Option<NetworkOptions>,
    client: Option<Arc<dyn AuthProvider>>,
    clients_created: u64,
}

impl AuthClientManager {
    /// Create a manager; no client is built until [`ensure_client`](Self::ensure_client)
    pub fn new(
        factory: Arc<dyn AuthProviderFactory>,
        client_key: impl Into<String>,
        mode: AuthenticationMode,
        sdk_options: SdkOptions,
        default_network: NetworkOptions,
    ) -> Self {
        Self {
            factory,
            client_key: client_key.into(),
            mode,
            sdk_options,
            default_network,
            bound_network: None,
            client: None,
            clients_created: 0,
        }
    }

    /// Return a client bound to `desired`, building one if needed.
    ///
    /// Without `desired` the live client is reused as is; if there is none, one
    /// is built for the last bound network, falling back to the default.
    pub fn ensure_client(&mut self, desired: Option<&NetworkOptions>) -> Result<BoundClient> {
        if let (Some(client), Some(bound)) = (&self.client, &self.bound_network) {
            let reuse = match desired {
                None => true,
                Some(desired) => desired.chain_id == bound.chain_id,
            };
            if reuse {
                return Ok(BoundClient {
                    client: Arc::clone(client),
                    network: bound.clone(),
                    created: false,
                });
            }
        }

        let network = desired
            .or(self.bound_network.as_ref())
            .unwrap_or(&self.default_network)
            .clone();

        let client = self
            .factory
            .create(&self.client_key, &network, self.mode, &self.sdk_options)?;
        self.clients_created += 1;
        info!(
            "Created auth client for chain {} via {}",
            network.chain_id, network.rpc_url
        );

        self.client = Some(Arc::clone(&client));
        self.bound_network = Some(network.clone());

        Ok(BoundClient {
            client,
            network,
            created: true,
        })
    }

    /// The live client, if any
    pub fn current(&self) -> Option<Arc<dyn AuthProvider>> {
        self.client.clone()
    }

    /// Network the live (or last) client was built for
    pub fn bound_network(&self) -> Option<&NetworkOptions> {
        self.bound_network.as_ref()
    }

    /// Chain id the live (or last) client was built for
    pub fn bound_chain_id(&self) -> Option<ChainId> {
        self.bound_network.as_ref().map(|network| network.chain_id)
    }

    /// Number of clients built so far
    pub fn clients_created(&self) -> u64 {
        self.clients_created
    }

    /// Drop the live client, remembering which network it was bound to
    pub fn discard(&mut self) {
        self.client = None;
    }

    /// Authentication mode clients are built with
    pub fn mode(&self) -> AuthenticationMode {
        self.mode
    }
}

impl fmt::Debug for AuthClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClientManager")
            .field("mode", &self.mode)
            .field("default_network", &self.default_network)
            .field("bound_network", &self.bound_network)
            .field("has_client", &self.client.is_some())
            .field("clients_created", &self.clients_created)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct NullClient;

    #[async_trait]
    impl AuthProvider for NullClient {
        async fn is_session_active(&self) -> Result<bool> {
            Ok(false)
        }

        async fn interactive_login(&self) -> Result<()> {
            Ok(())
        }

        async fn chain_provider(&self) -> Result<Option<Arc<dyn ChainProvider>>> {
            Ok(None)
        }

        async fn logout(&self) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        built: Mutex<Vec<NetworkOptions>>,
        fail: bool,
    }

    impl AuthProviderFactory for CountingFactory {
        fn create(
            &self,
            client_key: &str,
            network: &NetworkOptions,
            _mode: AuthenticationMode,
            _options: &SdkOptions,
        ) -> Result<Arc<dyn AuthProvider>> {
            assert_eq!(client_key, "pk_test");
            if self.fail {
                return Err(Error::sdk("invalid client key"));
            }
            self.built.lock().unwrap().push(network.clone());
            Ok(Arc::new(NullClient))
        }
    }

    fn manager(factory: Arc<CountingFactory>) -> AuthClientManager {
        AuthClientManager::new(
            factory,
            "pk_test",
            AuthenticationMode::EmbeddedWallet,
            SdkOptions::new(),
            NetworkOptions::new("https://rpc.example", 1),
        )
    }

    #[test]
    fn test_first_client_uses_default_network() {
        let factory = Arc::new(CountingFactory::default());
        let mut clients = manager(factory.clone());

        let bound = clients.ensure_client(None).unwrap();
        assert!(bound.created);
        assert_eq!(bound.network.chain_id, 1);
        assert_eq!(clients.bound_chain_id(), Some(1));
        assert_eq!(clients.clients_created(), 1);
    }

    #[test]
    fn test_same_chain_reuses_client() {
        let factory = Arc::new(CountingFactory::default());
        let mut clients = manager(factory.clone());
        clients.ensure_client(None).unwrap();

        let same = NetworkOptions::new("https://other-rpc.example", 1);
        let bound = clients.ensure_client(Some(&same)).unwrap();
        assert!(!bound.created);
        assert_eq!(bound.network.rpc_url, "https://rpc.example");
        assert_eq!(clients.clients_created(), 1);
    }

    #[test]
    fn test_different_chain_recreates_client() {
        let factory = Arc::new(CountingFactory::default());
        let mut clients = manager(factory.clone());
        clients.ensure_client(None).unwrap();

        let polygon = NetworkOptions::new("https://poly.example", 137);
        let bound = clients.ensure_client(Some(&polygon)).unwrap();
        assert!(bound.created);
        assert_eq!(clients.bound_chain_id(), Some(137));
        assert_eq!(clients.clients_created(), 2);
        assert_eq!(factory.built.lock().unwrap()[1], polygon);
    }

    #[test]
    fn test_discard_keeps_bound_network() {
        let factory = Arc::new(CountingFactory::default());
        let mut clients = manager(factory.clone());
        clients
            .ensure_client(Some(&NetworkOptions::new("https://poly.example", 137)))
            .unwrap();

        clients.discard();
        assert!(clients.current().is_none());

        let bound = clients.ensure_client(None).unwrap();
        assert!(bound.created);
        assert_eq!(bound.network.chain_id, 137);
    }

    #[test]
    fn test_construction_failure_propagates() {
        let factory = Arc::new(CountingFactory {
            fail: true,
            ..Default::default()
        });
        let mut clients = manager(factory);

        let err = clients.ensure_client(None).unwrap_err();
        assert!(matches!(err, Error::Sdk(_)));
        assert_eq!(clients.clients_created(), 0);
        assert!(clients.bound_network().is_none());
    }

    #[tokio::test]
    async fn test_absent_provider_is_an_error() {
        let factory = Arc::new(CountingFactory::default());
        let mut clients = manager(factory);
        let bound = clients.ensure_client(None).unwrap();

        let err = bound.chain_provider().await.err().unwrap();
        assert!(matches!(err, Error::ProviderUnavailable));
    }
}
