//! Public types for the connection store.

use serde::Serialize;

use walletgate_connectors::RegistryError;
use walletgate_protocol::{ChainId, ChainMetadata, ChainTable, ConnectError, format_address};

/// Read-only view of the connection state, as seen by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,
    pub is_connected: bool,
    pub is_connecting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Id of the connector backing the current account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_connector: Option<String>,
}

impl ConnectionSnapshot {
    /// Shortened account for display, e.g. `0x1234...5678`.
    pub fn short_account(&self) -> Option<String> {
        self.account.as_deref().map(|a| format_address(a, 4))
    }

    /// Display metadata for the current chain.
    pub fn chain(&self, table: &ChainTable) -> Option<ChainMetadata> {
        self.chain_id.map(|id| table.lookup(id))
    }
}

/// Errors returned by [`ConnectionStore`](crate::ConnectionStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    ConnectorNotRegistered(#[from] RegistryError),

    #[error("Connection already in progress")]
    OperationInProgress,

    #[error("No active connection")]
    NoActiveConnection,

    /// A disconnect or reset ran while the operation was in flight; its
    /// result was discarded.
    #[error("Operation superseded by disconnect")]
    Superseded,

    #[error(transparent)]
    Connect(#[from] ConnectError),
}
