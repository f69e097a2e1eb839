//! Account identifiers and chain id encodings.
//!
//! Remote sessions report accounts as `"<namespace>:<chainId>:<address>"`,
//! injected providers report chain ids as `0x`-prefixed hex strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::ChainId;

/// An account string qualified by protocol namespace and chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespacedAccount {
    pub namespace: String,
    pub chain_id: ChainId,
    pub address: String,
}

impl FromStr for NamespacedAccount {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(namespace), Some(chain), Some(address)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::MalformedAccount(s.to_string()));
        };
        if namespace.is_empty() || address.is_empty() {
            return Err(ParseError::MalformedAccount(s.to_string()));
        }
        let chain_id = chain
            .parse::<ChainId>()
            .map_err(|_| ParseError::InvalidChainId(chain.to_string()))?;
        Ok(Self {
            namespace: namespace.to_string(),
            chain_id,
            address: address.to_string(),
        })
    }
}

impl fmt::Display for NamespacedAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.chain_id, self.address)
    }
}

/// Parses a `0x`-prefixed hex chain id (`"0x89"` → 137).
///
/// A missing prefix is tolerated; some providers return bare hex.
pub fn parse_hex_chain_id(s: &str) -> Result<ChainId, ParseError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ParseError::InvalidChainId(s.to_string()));
    }
    ChainId::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidChainId(s.to_string()))
}

/// Encodes a chain id the way providers expect it in requests.
pub fn to_hex_chain_id(chain_id: ChainId) -> String {
    format!("0x{chain_id:x}")
}
