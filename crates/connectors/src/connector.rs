//! The connector contract shared by every wallet backend.

use std::sync::Arc;

use async_trait::async_trait;

use walletgate_protocol::{ChainId, ConnectError, ConnectResult, ConnectorInfo};

/// Listener for account changes reported by a backend.
pub type AccountsListener = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Listener for chain changes; receives the raw (hex) chain id.
pub type ChainListener = Arc<dyn Fn(String) + Send + Sync>;

/// A pluggable backend adapter implementing one wallet-connection protocol.
///
/// Connectors never panic or leak foreign errors out of [`connect`]; every
/// failure is a [`ConnectError`] value.
///
/// [`connect`]: Connector::connect
#[async_trait]
pub trait Connector: Send + Sync {
    /// Identity, presentation metadata and capability flags.
    fn info(&self) -> &ConnectorInfo;

    fn id(&self) -> &str {
        &self.info().id
    }

    /// Synchronous environment probe: is the backend present right now?
    fn installed(&self) -> bool;

    /// Whether the backend can be offered to the user. May be true without
    /// [`installed`](Connector::installed) (deep links, remote pairing).
    async fn is_available(&self) -> Result<bool, ConnectError>;

    /// Runs the backend handshake.
    async fn connect(&self) -> ConnectResult;

    /// Releases backend resources held for a connection.
    async fn disconnect(&self) -> Result<(), ConnectError>;

    /// Whether [`switch_network`](Connector::switch_network) can succeed in
    /// the current environment.
    fn supports_network_switch(&self) -> bool {
        false
    }

    /// Asks the backend to move to another chain.
    async fn switch_network(&self, _chain_id: ChainId) -> Result<(), ConnectError> {
        Err(ConnectError::NetworkSwitchUnsupported)
    }

    /// Native change notifications, if the backend emits any.
    fn events(&self) -> Option<&dyn ProviderEvents> {
        None
    }
}

/// Change notifications exposed by a connected backend.
pub trait ProviderEvents: Send + Sync {
    fn on_accounts_changed(&self, listener: AccountsListener);

    fn on_chain_changed(&self, listener: ChainListener);

    /// Detaches every listener attached through this handle.
    fn remove_listeners(&self);
}
