//! Boundary to an out-of-band pairing/relay service.
//!
//! The service turns a [`PairingRequest`] into a surface the user can act
//! on (QR code, universal link). Once the remote peer approves, polling the
//! surface yields a [`RemoteSession`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use walletgate_protocol::ChainId;

/// Errors reported by the pairing service or a remote session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("relay error: {0}")]
    Relay(String),

    #[error("session closed")]
    Closed,
}

/// Application identity shown to the remote wallet during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "Web3 App".into(),
            description: "A Web3 application".into(),
            url: None,
            icon: None,
        }
    }
}

/// A wallet app suggested on the pairing surface for mobile users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileWallet {
    pub id: String,
    pub name: String,
    pub native_link: String,
    pub universal_link: String,
}

/// Wallets recommended on the pairing surface.
pub fn recommended_mobile_wallets() -> Vec<MobileWallet> {
    vec![
        MobileWallet {
            id: "metamask".into(),
            name: "MetaMask".into(),
            native_link: "metamask://".into(),
            universal_link: "https://metamask.app.link".into(),
        },
        MobileWallet {
            id: "rainbow".into(),
            name: "Rainbow".into(),
            native_link: "rainbow://".into(),
            universal_link: "https://rainbow.me".into(),
        },
    ]
}

/// Everything the relay needs to open a pairing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    /// Correlates log lines and relay traffic for one attempt.
    pub request_id: String,
    pub project_id: String,
    pub chains: Vec<ChainId>,
    pub metadata: AppMetadata,
    pub mobile_wallets: Vec<MobileWallet>,
}

/// Result of polling a pairing surface once.
pub enum PairingPoll {
    Pending,
    Approved(Arc<dyn RemoteSession>),
    /// The user dismissed the surface.
    Closed,
}

#[async_trait]
pub trait PairingService: Send + Sync {
    async fn open(&self, request: &PairingRequest) -> Result<Box<dyn PairingSurface>, PairingError>;
}

/// An open pairing surface (QR modal or universal link).
#[async_trait]
pub trait PairingSurface: Send {
    /// Pairing URI encoded in the QR code / link.
    fn uri(&self) -> &str;

    fn poll(&mut self) -> PairingPoll;

    /// Dismisses the surface; called on every non-approved exit.
    async fn close(&mut self);
}

/// An established remote session.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    fn topic(&self) -> &str;

    /// Namespace-qualified accounts, e.g. `eip155:1:0xabc…`.
    fn accounts(&self) -> Vec<String>;

    fn is_active(&self) -> bool;

    async fn disconnect(&self) -> Result<(), PairingError>;
}
