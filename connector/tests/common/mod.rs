#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use auth_connector::prelude::*;
use auth_connector::simulated::{ActionCall, RecordingActions, SimulatedSdk, SimulatedWalletConfig};
use auth_connector_core::config::ConnectorConfigBuilder;

pub const ACCOUNT: &str = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f";

/// A connector wired to a simulated SDK and a recording store.
pub struct Harness {
    pub actions: RecordingActions,
    pub sdk: SimulatedSdk,
    pub connector: AuthConnector,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn store(&self) -> ConnectionState {
        self.actions.store().snapshot()
    }

    pub fn starts(&self) -> usize {
        self.actions
            .count(|call| matches!(call, ActionCall::StartActivation))
    }

    pub fn cancels(&self) -> usize {
        self.actions
            .count(|call| matches!(call, ActionCall::CancelActivation))
    }

    pub fn resets(&self) -> usize {
        self.actions
            .count(|call| matches!(call, ActionCall::ResetState))
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

/// Connector configuration bound to chain 1 that also knows about chain 137.
pub fn connector_config() -> ConnectorConfigBuilder {
    ConnectorConfig::builder()
        .with_client_key("pk_test")
        .with_network(NetworkOptions::new("https://rpc.example", 1))
        .with_known_network(ChainParameters::new(137, "https://poly.example").with_name("Polygon"))
}

pub fn harness(wallet: SimulatedWalletConfig) -> Harness {
    harness_with(wallet, connector_config().build())
}

pub fn harness_with(wallet: SimulatedWalletConfig, config: ConnectorConfig) -> Harness {
    let actions = RecordingActions::new();
    let sdk = SimulatedSdk::new(wallet);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);

    let connector = AuthConnector::new(ConnectorArgs {
        actions: Arc::new(actions.clone()),
        factory: Arc::new(sdk.clone()),
        config,
        on_error: Some(Arc::new(move |e: &Error| {
            sink.lock().unwrap().push(e.to_string());
        })),
    })
    .expect("connector should build");

    Harness {
        actions,
        sdk,
        connector,
        errors,
    }
}

pub fn logged_in() -> SimulatedWalletConfig {
    SimulatedWalletConfig {
        logged_in: true,
        ..Default::default()
    }
}

pub fn account() -> Vec<String> {
    vec![ACCOUNT.to_string()]
}
