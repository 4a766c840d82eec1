//! Contracts for the authentication SDK and the chain provider it hands out
//!
//! The connector never talks to a concrete SDK. It is handed an
//! [`AuthProviderFactory`] at construction and only ever goes through these
//! traits, which keeps the SDK's ambient session state out of the connector
//! and lets tests substitute fakes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain_id;
use crate::error::{Error, Result};
use crate::types::{AuthenticationMode, ChainId, NetworkOptions, RawChainId};

/// Extra options forwarded verbatim to the SDK constructor
pub type SdkOptions = BTreeMap<String, Value>;

/// JSON-RPC method returning the current chain id
pub const METHOD_CHAIN_ID: &str = "eth_chainId";
/// JSON-RPC method returning the connected accounts
pub const METHOD_ACCOUNTS: &str = "eth_accounts";
/// EIP-3326 chain switch request
pub const METHOD_SWITCH_CHAIN: &str = "wallet_switchEthereumChain";

/// A JSON-RPC style request sent to a chain provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Method name
    pub method: String,
    /// Positional parameters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

impl RpcRequest {
    /// Request without parameters
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
        }
    }

    /// `eth_chainId`
    pub fn chain_id() -> Self {
        Self::new(METHOD_CHAIN_ID)
    }

    /// `eth_accounts`
    pub fn accounts() -> Self {
        Self::new(METHOD_ACCOUNTS)
    }

    /// `wallet_switchEthereumChain` to `chain_id`
    pub fn switch_chain(chain_id: ChainId) -> Self {
        Self {
            method: METHOD_SWITCH_CHAIN.to_string(),
            params: vec![serde_json::json!({ "chainId": chain_id::to_hex(chain_id) })],
        }
    }
}

/// Payload of a provider `connect` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    /// Chain the provider connected to
    pub chain_id: RawChainId,
}

/// Error object attached to a provider `disconnect` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRpcError {
    /// EIP-1193 error code
    pub code: i64,
    /// Human readable message
    pub message: String,
    /// Optional extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// Create an error without extra data
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<ProviderRpcError> for Error {
    fn from(err: ProviderRpcError) -> Self {
        Error::provider_rpc(err.code, err.message)
    }
}

/// Lifecycle event emitted by a chain provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// The provider can serve requests for a chain
    Connect(ConnectInfo),
    /// The provider lost its connection
    Disconnect(Option<ProviderRpcError>),
    /// The active chain changed
    ChainChanged(RawChainId),
    /// The exposed accounts changed
    AccountsChanged(Vec<String>),
}

impl ProviderEvent {
    /// The kind of this event, used as the subscription key
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::Connect(_) => ProviderEventKind::Connect,
            ProviderEvent::Disconnect(_) => ProviderEventKind::Disconnect,
            ProviderEvent::ChainChanged(_) => ProviderEventKind::ChainChanged,
            ProviderEvent::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
        }
    }
}

/// Event names a listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderEventKind {
    /// `connect`
    Connect,
    /// `disconnect`
    Disconnect,
    /// `chainChanged`
    ChainChanged,
    /// `accountsChanged`
    AccountsChanged,
}

impl ProviderEventKind {
    /// All event kinds, in subscription order
    pub const ALL: [ProviderEventKind; 4] = [
        ProviderEventKind::Connect,
        ProviderEventKind::Disconnect,
        ProviderEventKind::ChainChanged,
        ProviderEventKind::AccountsChanged,
    ];

    /// The EIP-1193 event name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::Connect => "connect",
            ProviderEventKind::Disconnect => "disconnect",
            ProviderEventKind::ChainChanged => "chainChanged",
            ProviderEventKind::AccountsChanged => "accountsChanged",
        }
    }
}

impl fmt::Display for ProviderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered event handler.
///
/// Listeners are compared by identity, not by behaviour: removing a listener
/// only works with a clone of the exact value that was registered.
#[derive(Clone)]
pub struct EventListener {
    callback: Arc<dyn Fn(&ProviderEvent) + Send + Sync>,
}

impl EventListener {
    /// Wrap a callback
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Invoke the callback
    pub fn call(&self, event: &ProviderEvent) {
        (self.callback)(event)
    }

    /// Whether both values refer to the same registration
    pub fn same_as(&self, other: &EventListener) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for EventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListener")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}

/// Object answering JSON-RPC calls and emitting lifecycle events for one network
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Send a request and wait for its result
    async fn request(&self, request: RpcRequest) -> Result<Value>;

    /// Register `listener` for `event`
    fn on(&self, event: ProviderEventKind, listener: EventListener);

    /// Remove a listener previously registered for `event`.
    ///
    /// Removing a listener that is not registered is a no-op.
    fn remove_listener(&self, event: ProviderEventKind, listener: &EventListener);

    /// Whether this provider is a third-party wallet injected into the host
    fn is_injected_wallet(&self) -> bool {
        false
    }
}

/// A live authentication SDK client bound to one network
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Whether a previously authenticated session can be resumed silently
    async fn is_session_active(&self) -> Result<bool>;

    /// Run the SDK's interactive login; resolves once the user is done
    async fn interactive_login(&self) -> Result<()>;

    /// The chain provider, if the SDK has materialized one
    async fn chain_provider(&self) -> Result<Option<Arc<dyn ChainProvider>>>;

    /// End the SDK session
    async fn logout(&self) -> Result<()>;
}

/// Constructs SDK clients, one per network
pub trait AuthProviderFactory: Send + Sync {
    /// Build a client for `network`
    fn create(
        &self,
        client_key: &str,
        network: &NetworkOptions,
        mode: AuthenticationMode,
        options: &SdkOptions,
    ) -> Result<Arc<dyn AuthProvider>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_chain_request() {
        let request = RpcRequest::switch_chain(137);
        assert_eq!(request.method, METHOD_SWITCH_CHAIN);
        assert_eq!(request.params, vec![serde_json::json!({ "chainId": "0x89" })]);
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&RpcRequest::accounts()).unwrap();
        assert_eq!(json, r#"{"method":"eth_accounts"}"#);
    }

    #[test]
    fn test_listener_identity() {
        let a = EventListener::new(|_| {});
        let b = EventListener::new(|_| {});
        let a_clone = a.clone();

        assert!(a.same_as(&a_clone));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_event_kind() {
        let event = ProviderEvent::AccountsChanged(Vec::new());
        assert_eq!(event.kind(), ProviderEventKind::AccountsChanged);
        assert_eq!(event.kind().to_string(), "accountsChanged");
        assert_eq!(ProviderEventKind::ALL.len(), 4);
    }

    #[test]
    fn test_connect_info_deserialization() {
        let info: ConnectInfo = serde_json::from_str(r#"{"chainId":"0x1"}"#).unwrap();
        assert_eq!(info.chain_id, RawChainId::Text("0x1".to_string()));
    }

    #[test]
    fn test_rpc_error_conversion() {
        let err: Error = ProviderRpcError::new(4900, "gone").into();
        assert!(matches!(err, Error::ProviderRpc { code: 4900, .. }));
    }
}
