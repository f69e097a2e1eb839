use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Provider method that prompts the user to authorize accounts.
pub const METHOD_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";

/// Provider method returning the current chain id as a hex string.
pub const METHOD_CHAIN_ID: &str = "eth_chainId";

/// Provider method asking the wallet to switch to another chain.
pub const METHOD_SWITCH_CHAIN: &str = "wallet_switchEthereumChain";

/// EIP-1193 error code for a request the user rejected.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Namespace used for EVM chains in namespace-qualified account strings.
pub const EIP155_NAMESPACE: &str = "eip155";

/// How often a pairing surface is polled for an established session.
pub const PAIRING_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Hard bound on waiting for a remote peer to approve a pairing.
///
/// Measured from the first poll, not from opening the surface.
pub const PAIRING_TIMEOUT: Duration = Duration::from_secs(30);

/// Universal-link prefix that opens a page inside the MetaMask mobile app.
pub const METAMASK_DEEP_LINK_BASE: &str = "https://metamask.app.link/dapp/";

/// Explorer used when a chain has no entry in the metadata table.
pub const DEFAULT_EXPLORER_URL: &str = "https://etherscan.io";

/// Native change notifications emitted by an injected provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
    #[serde(rename = "accountsChanged")]
    AccountsChanged,
    #[serde(rename = "chainChanged")]
    ChainChanged,
}

impl ProviderEventKind {
    /// Event name as used by the provider's emitter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::AccountsChanged => "accountsChanged",
            ProviderEventKind::ChainChanged => "chainChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ProviderEventKind::AccountsChanged).unwrap(),
            "\"accountsChanged\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderEventKind::ChainChanged).unwrap(),
            "\"chainChanged\""
        );
    }

    #[test]
    fn event_kind_name_matches_serde() {
        for kind in [
            ProviderEventKind::AccountsChanged,
            ProviderEventKind::ChainChanged,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.as_str());
        }
    }

    #[test]
    fn pairing_bounds() {
        assert_eq!(PAIRING_POLL_INTERVAL, Duration::from_millis(100));
        assert_eq!(PAIRING_TIMEOUT, Duration::from_secs(30));
        assert!(PAIRING_POLL_INTERVAL < PAIRING_TIMEOUT);
    }
}
