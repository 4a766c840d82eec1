//! Configuration management for the Auth Connector
//!
//! This module provides the configuration a connector is constructed with and
//! the utilities to load it. Configuration can come from the following
//! sources, highest priority first:
//! 1. Environment variables (`AUTH_CONNECTOR_CLIENT_KEY`)
//! 2. Configuration files (YAML/JSON)
//! 3. Default values
//!
//! # Example
//!
//! ```no_run
//! use auth_connector_core::config::ConnectorConfig;
//! use auth_connector_core::types::{ChainParameters, NetworkOptions};
//!
//! // Create configuration with builder pattern
//! let config = ConnectorConfig::builder()
//!     .with_client_key("pk_live_123")
//!     .with_network(NetworkOptions::new("https://rpc.example", 1))
//!     .with_known_network(ChainParameters::new(137, "https://poly.example"))
//!     .build();
//!
//! // Load configuration from file
//! let config = ConnectorConfig::from_file("connector.yaml")?;
//! # Ok::<(), auth_connector_core::Error>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider::SdkOptions;
use crate::types::{
    ActivationPolicy, AuthenticationMode, ChainId, ChainParameters, NetworkOptions,
};

/// Environment variable overriding the SDK client key
pub const CLIENT_KEY_ENV: &str = "AUTH_CONNECTOR_CLIENT_KEY";

/// Main configuration structure for a connector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Publishable key identifying the application to the SDK
    pub client_key: String,
    /// Network the first SDK client is bound to
    pub network: NetworkOptions,
    /// SDK flavour
    pub mode: AuthenticationMode,
    /// Behaviour for overlapping `activate` calls
    pub activation_policy: ActivationPolicy,
    /// Networks a bare chain id can be resolved against
    pub known_networks: Vec<ChainParameters>,
    /// Options passed through to the SDK constructor untouched
    pub sdk_options: SdkOptions,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (error, warn, info, debug, trace)
    pub level: LogLevel,
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            client_key: String::new(),
            network: NetworkOptions::new("https://cloudflare-eth.com", 1),
            mode: AuthenticationMode::default(),
            activation_policy: ActivationPolicy::default(),
            known_networks: Vec::new(),
            sdk_options: SdkOptions::new(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }
}

impl ConnectorConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder
    pub fn builder() -> ConnectorConfigBuilder {
        ConnectorConfigBuilder::new()
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse YAML config: {}", e)))
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse JSON config: {}", e)))
    }

    /// Load configuration from a file (auto-detects format by extension)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match ConfigFormat::from_path(path)? {
            ConfigFormat::Yaml => Self::from_yaml_file(path),
            ConfigFormat::Json => Self::from_json_file(path),
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::config(format!("Failed to serialize config to YAML: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config to JSON: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))
    }

    /// Save configuration to a file (format chosen by extension)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match ConfigFormat::from_path(path)? {
            ConfigFormat::Yaml => self.save_to_yaml_file(path),
            ConfigFormat::Json => self.save_to_json_file(path),
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(CLIENT_KEY_ENV) {
            if !key.trim().is_empty() {
                self.client_key = key;
            }
        }
    }

    /// Check the configuration can be used to construct a connector
    pub fn validate(&self) -> Result<()> {
        if self.client_key.trim().is_empty() {
            return Err(Error::invalid_config("client_key must not be empty"));
        }
        if self.network.rpc_url.trim().is_empty() {
            return Err(Error::invalid_config("network.rpc_url must not be empty"));
        }
        if self.network.chain_id == 0 {
            return Err(Error::invalid_config("network.chain_id must be positive"));
        }
        for params in &self.known_networks {
            params.network().map_err(|e| {
                Error::invalid_config(format!("known network {}: {}", params.chain_id, e))
            })?;
        }
        Ok(())
    }

    /// Network options for a bare chain id, from the default network or the
    /// known networks
    pub fn network_for(&self, chain_id: ChainId) -> Option<NetworkOptions> {
        if self.network.chain_id == chain_id {
            return Some(self.network.clone());
        }
        self.known_networks
            .iter()
            .find(|params| params.chain_id == chain_id)
            .and_then(|params| params.network().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::config(format!(
                "Unsupported config file format: {}. Supported: .yaml, .yml, .json",
                extension
            ))),
        }
    }
}

impl LogLevel {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Builder for ConnectorConfig with fluent interface
pub struct ConnectorConfigBuilder {
    config: ConnectorConfig,
}

impl ConnectorConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ConnectorConfig::default(),
        }
    }

    /// Set the SDK client key
    pub fn with_client_key(mut self, key: impl Into<String>) -> Self {
        self.config.client_key = key.into();
        self
    }

    /// Set the default network
    pub fn with_network(mut self, network: NetworkOptions) -> Self {
        self.config.network = network;
        self
    }

    /// Set the authentication mode
    pub fn with_mode(mut self, mode: AuthenticationMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the activation policy
    pub fn with_activation_policy(mut self, policy: ActivationPolicy) -> Self {
        self.config.activation_policy = policy;
        self
    }

    /// Add a network bare chain ids can resolve to
    pub fn with_known_network(mut self, params: ChainParameters) -> Self {
        self.config.known_networks.push(params);
        self
    }

    /// Add an option forwarded to the SDK
    pub fn with_sdk_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.sdk_options.insert(key.into(), value);
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ConnectorConfig {
        self.config
    }
}

impl Default for ConnectorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> ConnectorConfig {
        ConnectorConfig::builder()
            .with_client_key("pk_test_123")
            .with_network(NetworkOptions::new("https://rpc.example", 1))
            .with_known_network(ChainParameters::new(137, "https://poly.example"))
            .with_sdk_option("locale", serde_json::json!("en_US"))
            .build()
    }

    #[test]
    fn test_default_config() {
        let config = ConnectorConfig::default();

        assert!(config.client_key.is_empty());
        assert_eq!(config.network.chain_id, 1);
        assert_eq!(config.mode, AuthenticationMode::EmbeddedWallet);
        assert_eq!(config.activation_policy, ActivationPolicy::Overlap);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ConnectorConfig::builder()
            .with_client_key("pk")
            .with_mode(AuthenticationMode::ExternalWalletBridge)
            .with_activation_policy(ActivationPolicy::Serialize)
            .with_log_level(LogLevel::Debug)
            .build();

        assert_eq!(config.client_key, "pk");
        assert_eq!(config.mode, AuthenticationMode::ExternalWalletBridge);
        assert_eq!(config.activation_policy, ActivationPolicy::Serialize);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut config = sample();
        config.network.rpc_url = " ".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let mut config = sample();
        config.network.chain_id = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.known_networks[0].rpc_urls.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_network_for() {
        let config = sample();
        assert_eq!(config.network_for(1), Some(config.network.clone()));
        assert_eq!(
            config.network_for(137),
            Some(NetworkOptions::new("https://poly.example", 137))
        );
        assert_eq!(config.network_for(10), None);
    }

    #[test]
    fn test_config_serialization() {
        let config = sample();

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("client_key:"));
        assert!(yaml.contains("embedded-wallet"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"known_networks\""));
        assert!(json.contains("\"rpcUrls\""));
    }

    #[test]
    fn test_config_file_io() -> Result<()> {
        let temp_dir = tempdir().unwrap();

        for name in ["connector.yaml", "connector.json"] {
            let path = temp_dir.path().join(name);
            sample().save_to_file(&path)?;

            let loaded = ConnectorConfig::from_file(&path)?;
            assert_eq!(loaded.client_key, "pk_test_123");
            assert_eq!(loaded.known_networks.len(), 1);
            assert_eq!(loaded.sdk_options["locale"], serde_json::json!("en_US"));
        }

        Ok(())
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConnectorConfig::from_file("connector.toml").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("partial.yaml");
        std::fs::write(&path, "client_key: pk_partial\n")?;

        let loaded = ConnectorConfig::from_file(&path)?;
        assert_eq!(loaded.client_key, "pk_partial");
        assert_eq!(loaded.network.chain_id, 1);
        assert_eq!(loaded.activation_policy, ActivationPolicy::Overlap);
        Ok(())
    }
}
