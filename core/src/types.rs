//! Core data types for the Auth Connector
//!
//! This module defines the values that flow between the connector, the
//! authentication SDK and the shared connection-state store: chain ids as
//! reported by providers, network descriptions, state updates and the
//! connector's own lifecycle status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric identifier of a blockchain network
pub type ChainId = u64;

/// A chain id the way providers report it: a number or a decimal/hex string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChainId {
    /// Already numeric
    Number(ChainId),
    /// Textual, either `0x`-prefixed hex or decimal
    Text(String),
}

impl From<ChainId> for RawChainId {
    fn from(value: ChainId) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawChainId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawChainId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for RawChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawChainId::Number(n) => write!(f, "{}", n),
            RawChainId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The network an authentication client is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOptions {
    /// JSON-RPC endpoint used by the SDK for this network
    pub rpc_url: String,
    /// Chain id of the network
    pub chain_id: ChainId,
}

impl NetworkOptions {
    /// Create network options for a chain served at `rpc_url`
    pub fn new(rpc_url: impl Into<String>, chain_id: ChainId) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id,
        }
    }
}

/// Native currency description used when adding a chain to a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Number of decimals
    pub decimals: u8,
}

/// Parameters describing a chain the host wants to switch to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParameters {
    /// Chain id
    pub chain_id: ChainId,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_name: Option<String>,
    /// Native currency of the chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_currency: Option<NativeCurrency>,
    /// RPC endpoints, the first one is used
    pub rpc_urls: Vec<String>,
    /// Block explorers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub block_explorer_urls: Vec<String>,
}

impl ChainParameters {
    /// Create chain parameters with a single RPC endpoint
    pub fn new(chain_id: ChainId, rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id,
            chain_name: None,
            native_currency: None,
            rpc_urls: vec![rpc_url.into()],
            block_explorer_urls: Vec::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.chain_name = Some(name.into());
        self
    }

    /// Network options for these parameters, using the first RPC URL
    pub fn network(&self) -> Result<NetworkOptions> {
        let rpc_url = self
            .rpc_urls
            .first()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::invalid_chain_parameters(format!(
                    "chain {} has no RPC URL",
                    self.chain_id
                ))
            })?;

        Ok(NetworkOptions::new(rpc_url.clone(), self.chain_id))
    }
}

/// Chain requested by a caller of `activate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredChain {
    /// A chain id only; the network must already be known
    Id(ChainId),
    /// A full chain description
    Parameters(ChainParameters),
}

impl DesiredChain {
    /// The chain id requested
    pub fn chain_id(&self) -> ChainId {
        match self {
            DesiredChain::Id(id) => *id,
            DesiredChain::Parameters(params) => params.chain_id,
        }
    }
}

impl From<ChainId> for DesiredChain {
    fn from(value: ChainId) -> Self {
        Self::Id(value)
    }
}

impl From<ChainParameters> for DesiredChain {
    fn from(value: ChainParameters) -> Self {
        Self::Parameters(value)
    }
}

/// Partial update pushed into the connection-state store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    /// New chain id, if it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    /// New account list, if it changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,
}

impl StateUpdate {
    /// Update carrying only a chain id
    pub fn chain_id(chain_id: ChainId) -> Self {
        Self {
            chain_id: Some(chain_id),
            accounts: None,
        }
    }

    /// Update carrying only an account list
    pub fn accounts(accounts: Vec<String>) -> Self {
        Self {
            chain_id: None,
            accounts: Some(accounts),
        }
    }

    /// Combined update
    pub fn connected(chain_id: ChainId, accounts: Vec<String>) -> Self {
        Self {
            chain_id: Some(chain_id),
            accounts: Some(accounts),
        }
    }
}

/// Snapshot of the shared connection state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    /// Chain id of the connected network
    pub chain_id: Option<ChainId>,
    /// Connected accounts, in provider order
    pub accounts: Vec<String>,
    /// Whether an activation is in flight
    pub activating: bool,
}

impl ConnectionState {
    /// A chain id and at least one account are known
    pub fn is_connected(&self) -> bool {
        self.chain_id.is_some() && !self.accounts.is_empty()
    }

    /// First account, if any
    pub fn primary_account(&self) -> Option<&str> {
        self.accounts.first().map(String::as_str)
    }
}

/// Lifecycle status of a connector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectorStatus {
    /// Nothing in flight, nothing published
    #[default]
    Idle,
    /// An activation is running
    Activating,
    /// Chain id and accounts have been published
    Active,
    /// A deactivation is running
    Deactivating,
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectorStatus::Idle => "idle",
            ConnectorStatus::Activating => "activating",
            ConnectorStatus::Active => "active",
            ConnectorStatus::Deactivating => "deactivating",
        };
        f.write_str(name)
    }
}

/// Which flavour of the authentication SDK the connector drives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticationMode {
    /// Hosted wallet; the provider lives inside the SDK client
    #[default]
    EmbeddedWallet,
    /// The SDK brokers a connection to a third-party wallet, possibly injected
    ExternalWalletBridge,
}

/// What to do when `activate` is called while another activation runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationPolicy {
    /// Let both run; the store's activation token arbitrates
    #[default]
    Overlap,
    /// Queue the second call behind the first
    Serialize,
    /// Fail the second call with `ActivationInProgress`
    Reject,
}
