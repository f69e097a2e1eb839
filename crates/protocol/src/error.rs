//! Connector-level error types.

/// Why a connector handshake did not produce a connection.
///
/// Connectors return these as values; nothing above the connector boundary
/// has to catch a panic or a foreign error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("{0}")]
    ProviderNotFound(String),

    #[error("User rejected connection")]
    UserRejected,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Failed to establish session: {0}")]
    SessionEstablishmentFailed(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("Network switching not supported")]
    NetworkSwitchUnsupported,

    /// Control left the process through a deep link; no result will follow.
    #[error("Redirecting to {app} mobile app...")]
    Redirecting { app: String, url: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl ConnectError {
    /// Returns true if the user explicitly declined the request.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ConnectError::UserRejected)
    }
}

/// Errors from parsing chain ids and account strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed account string: {0:?}")]
    MalformedAccount(String),

    #[error("invalid chain id: {0:?}")]
    InvalidChainId(String),
}
