use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// Numeric chain identifier (EIP-155).
pub type ChainId = u64;

/// Outcome of a connector handshake.
pub type ConnectResult = Result<Connection, ConnectError>;

/// An authorized account and the chain it was reported on.
///
/// Construction goes through [`Connection::new`], so a value of this type
/// always carries a non-empty account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<ChainId>,
}

impl Connection {
    /// Builds a connection, rejecting an empty account.
    pub fn new(account: impl Into<String>, chain_id: Option<ChainId>) -> Result<Self, ConnectError> {
        let account = account.into();
        if account.trim().is_empty() {
            return Err(ConnectError::ProviderNotFound("No accounts found".into()));
        }
        Ok(Self { account, chain_id })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }
}

/// Static description of a connector, used for listing wallet choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorInfo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub mobile: bool,
    #[serde(default)]
    pub desktop: bool,
    #[serde(default)]
    pub extension: bool,
}

impl ConnectorInfo {
    /// Creates an entry with only identity set; capability flags are off.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon_url: None,
            icon_background: None,
            download_url: None,
            description: None,
            mobile: false,
            desktop: false,
            extension: false,
        }
    }
}
