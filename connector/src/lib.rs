//! Wallet Authentication Connector
//!
//! This library adapts an externally hosted wallet/authentication SDK to the
//! connector contract of a wallet-aggregation host. The host owns a shared
//! connection-state store; the connector drives the SDK's login flow, binds to
//! the requested network and keeps the store in sync with provider events.
//!
//! # Features
//!
//! - **Eager reconnect**: resume an existing SDK session without user interaction
//! - **Activation**: interactive login, network selection, one atomic store write
//! - **Event bridging**: `connect`, `disconnect`, `chainChanged` and
//!   `accountsChanged` mapped onto store updates
//! - **Client management**: the SDK client is rebuilt only when the chain changes
//! - **Simulated SDK**: an in-process SDK for tests and the CLI (`simulated` feature)
//!
//! # Quick Start
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
//!     let connector = AuthConnector::new(ConnectorArgs {
//!         actions: Arc::new(store.clone()),
//!         factory: Arc::new(SimulatedSdk::new(SimulatedWalletConfig::default())),
//!         config: ConnectorConfig::builder().with_client_key("pk_live_123").build(),
//!         on_error: None,
//!     })?;
//!
//!     connector.activate(Some(DesiredChain::Id(1))).await?;
//!     println!("Connected: {:?}", store.snapshot());
//!
//!     connector.deactivate().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod bridge;
pub mod client;
pub mod connector;

#[cfg(feature = "simulated")]
pub mod simulated;

// Re-exports for convenience
pub use bridge::{ErrorHandler, ProviderEventBridge};
pub use client::{AuthClientManager, BoundClient};
pub use connector::{AuthConnector, ConnectorArgs};

pub use auth_connector_core::{Error, Result};

/// Prelude module for easy importing of common types
pub mod prelude {
    pub use super::{AuthClientManager, AuthConnector, ConnectorArgs, ErrorHandler};
    pub use auth_connector_core::prelude::*;
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library name
pub const NAME: &str = "auth-connector";
