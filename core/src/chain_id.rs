//! Chain id normalization
//!
//! Providers report chain ids as numbers, decimal strings or `0x`-prefixed
//! hex strings depending on the backend. Everything downstream compares chain
//! ids as integers, so every value entering the connector goes through
//! [`normalize`] first.

use crate::error::{Error, Result};
use crate::types::{ChainId, RawChainId};

/// Normalize a provider-reported chain id to an integer.
///
/// Numbers pass through unchanged. Text is parsed as hex when it carries a
/// `0x`/`0X` prefix and as decimal otherwise. Malformed text is an error.
pub fn normalize(value: &RawChainId) -> Result<ChainId> {
    match value {
        RawChainId::Number(n) => Ok(*n),
        RawChainId::Text(text) => parse(text),
    }
}

/// Parse a textual chain id
pub fn parse(text: &str) -> Result<ChainId> {
    let trimmed = text.trim();
    let parsed = match strip_hex_prefix(trimmed) {
        Some(digits) => ChainId::from_str_radix(digits, 16),
        None => trimmed.parse::<ChainId>(),
    };

    parsed.map_err(|_| Error::invalid_chain_id(text))
}

/// Render a chain id the way `wallet_switchEthereumChain` expects it
pub fn to_hex(chain_id: ChainId) -> String {
    format!("{:#x}", chain_id)
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}
