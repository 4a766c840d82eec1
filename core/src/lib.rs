//! Auth Connector Core Library
//!
//! This library provides the shared vocabulary for connecting an externally
//! hosted wallet/authentication SDK to a wallet-aggregation host. It defines
//! the collaborator contracts the connector is built against and the values
//! exchanged through them.
//!
//! # Features
//!
//! - **Chain id normalization**: hex/decimal/numeric chain ids reduced to integers
//! - **Collaborator contracts**: `AuthProvider`, `ChainProvider`, `ConnectorActions`
//! - **Reference store**: in-memory `ConnectionStore` with activation tokens
//! - **Configuration**: YAML/JSON loading, builder, validation
//!
//! # Quick Start
//!
//! ```no_run
//! use auth_connector_core::prelude::*;
//!
//! let store = ConnectionStore::new();
//! let token = store.start_activation();
//!
//! let chain_id = auth_connector_core::chain_id::normalize(&"0x89".into())?;
//! store.update(StateUpdate::connected(chain_id, vec!["0xabc".to_string()]));
//! assert!(store.snapshot().is_connected());
//!
//! // Too late to revert: the store has moved on
//! token.cancel();
//! # Ok::<(), auth_connector_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod actions;
pub mod chain_id;
pub mod config;
pub mod error;
pub mod provider;
pub mod types;

// Re-exports for convenience
pub use actions::{ActivationCancel, ConnectionStore, ConnectorActions};
pub use config::ConnectorConfig;
pub use error::{Error, Result};
pub use provider::{
    AuthProvider, AuthProviderFactory, ChainProvider, ConnectInfo, EventListener, ProviderEvent,
    ProviderEventKind, ProviderRpcError, RpcRequest, SdkOptions,
};
pub use types::{
    ActivationPolicy, AuthenticationMode, ChainId, ChainParameters, ConnectionState,
    ConnectorStatus, DesiredChain, NetworkOptions, RawChainId, StateUpdate,
};

/// Prelude module for easy importing of common types
pub mod prelude {
    pub use super::{
        ActivationCancel, ActivationPolicy, AuthProvider, AuthProviderFactory,
        AuthenticationMode, ChainId, ChainParameters, ChainProvider, ConnectInfo,
        ConnectionState, ConnectionStore, ConnectorActions, ConnectorConfig, ConnectorStatus,
        DesiredChain, Error, EventListener, NetworkOptions, ProviderEvent, ProviderEventKind,
        ProviderRpcError, RawChainId, Result, RpcRequest, SdkOptions, StateUpdate,
    };
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library name
pub const NAME: &str = "auth-connector-core";
