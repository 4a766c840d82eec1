//! Error types for the Auth Connector core library
//!
//! This module defines the single error type shared by the connector crates.
//! Failures that originate inside the authentication SDK or the chain provider
//! are carried through unchanged so callers see exactly what the collaborator
//! reported.

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, Error>;

/// EIP-1193 error code for a request the user rejected
pub const USER_REJECTED_REQUEST: i64 = 4001;

/// EIP-3326 error code for a chain the wallet does not know about
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Error type for Auth Connector operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A chain id could not be parsed as a number
    #[error("Invalid chain id: {0:?}")]
    InvalidChainId(String),

    /// Chain parameters were supplied without a usable network description
    #[error("Invalid chain parameters: {0}")]
    InvalidChainParameters(String),

    /// A bare chain id was requested that no configured network describes
    #[error("Unknown chain: {0}")]
    UnknownChain(u64),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Opaque failure reported by the authentication SDK
    #[error("Authentication SDK error: {0}")]
    Sdk(String),

    /// The user cancelled or refused the interactive login
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// The authentication SDK did not hand out a chain provider
    #[error("Chain provider unavailable")]
    ProviderUnavailable,

    /// Error object emitted or returned by the chain provider
    #[error("Provider RPC error {code}: {message}")]
    ProviderRpc {
        /// EIP-1193 error code
        code: i64,
        /// Human readable message
        message: String,
    },

    /// A provider response did not have the expected shape
    #[error("Invalid provider response for {method}: {reason}")]
    InvalidResponse {
        /// JSON-RPC method that produced the response
        method: String,
        /// What was wrong with it
        reason: String,
    },

    /// Another activation holds the activation gate
    #[error("Activation already in progress")]
    ActivationInProgress,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new invalid chain id error
    pub fn invalid_chain_id(raw: impl Into<String>) -> Self {
        Self::InvalidChainId(raw.into())
    }

    /// Create a new invalid chain parameters error
    pub fn invalid_chain_parameters(msg: impl Into<String>) -> Self {
        Self::InvalidChainParameters(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new SDK error
    pub fn sdk(msg: impl Into<String>) -> Self {
        Self::Sdk(msg.into())
    }

    /// Create a new provider RPC error
    pub fn provider_rpc(code: i64, message: impl Into<String>) -> Self {
        Self::ProviderRpc {
            code,
            message: message.into(),
        }
    }

    /// Create a new invalid response error
    pub fn invalid_response(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Check if the user turned the request down
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Self::LoginRejected(_) => true,
            Self::ProviderRpc { code, .. } => *code == USER_REJECTED_REQUEST,
            _ => false,
        }
    }

    /// Check if error is a chain id or chain parameter problem
    pub fn is_chain_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidChainId(_) | Self::InvalidChainParameters(_) | Self::UnknownChain(_)
        )
    }

    /// Check if error comes from loading or validating configuration
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidConfig(_) | Self::Yaml(_) | Self::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection() {
        assert!(Error::LoginRejected("closed".into()).is_user_rejection());
        assert!(Error::provider_rpc(USER_REJECTED_REQUEST, "denied").is_user_rejection());
        assert!(!Error::provider_rpc(UNRECOGNIZED_CHAIN, "unknown").is_user_rejection());
        assert!(!Error::ProviderUnavailable.is_user_rejection());
    }

    #[test]
    fn test_display() {
        let err = Error::provider_rpc(4900, "disconnected");
        assert_eq!(err.to_string(), "Provider RPC error 4900: disconnected");

        let err = Error::invalid_chain_id("0xzz");
        assert_eq!(err.to_string(), "Invalid chain id: \"0xzz\"");
    }

    #[test]
    fn test_classification() {
        assert!(Error::UnknownChain(10).is_chain_error());
        assert!(Error::invalid_config("empty client key").is_config_error());
        assert!(!Error::ActivationInProgress.is_chain_error());
    }
}
