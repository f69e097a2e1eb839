//! Chain metadata table used for presentation lookups.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EXPLORER_URL;
use crate::types::ChainId;

/// Native currency of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// A chain known to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub id: ChainId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub rpc_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_explorer_url: Option<String>,
    pub native_currency: NativeCurrency,
}

/// Display data resolved for a chain id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMetadata {
    pub id: ChainId,
    pub name: String,
    pub explorer_url: String,
    pub symbol: String,
    /// False when the id was not in the table and defaults were used.
    pub known: bool,
}

/// Ethereum mainnet, Polygon and BNB Smart Chain.
pub fn default_chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig {
            id: 1,
            name: "Ethereum".into(),
            icon_url: Some(
                "https://assets.coingecko.com/coins/images/279/small/ethereum.png".into(),
            ),
            rpc_url: "https://eth-mainnet.g.alchemy.com/v2/your-api-key".into(),
            block_explorer_url: Some("https://etherscan.io".into()),
            native_currency: NativeCurrency {
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
        },
        ChainConfig {
            id: 137,
            name: "Polygon".into(),
            icon_url: Some(
                "https://assets.coingecko.com/coins/images/4713/small/matic-token-icon.png".into(),
            ),
            rpc_url: "https://polygon-rpc.com".into(),
            block_explorer_url: Some("https://polygonscan.com".into()),
            native_currency: NativeCurrency {
                name: "MATIC".into(),
                symbol: "MATIC".into(),
                decimals: 18,
            },
        },
        ChainConfig {
            id: 56,
            name: "BNB Smart Chain".into(),
            icon_url: Some(
                "https://assets.coingecko.com/coins/images/825/small/bnb-icon2_2x.png".into(),
            ),
            rpc_url: "https://bsc-dataseed.binance.org".into(),
            block_explorer_url: Some("https://bscscan.com".into()),
            native_currency: NativeCurrency {
                name: "BNB".into(),
                symbol: "BNB".into(),
                decimals: 18,
            },
        },
    ]
}

/// Lookup table over a list of [`ChainConfig`]s.
///
/// Unknown ids resolve to name `"Unknown"`, the Etherscan explorer and the
/// `ETH` symbol.
#[derive(Debug, Clone)]
pub struct ChainTable {
    chains: Vec<ChainConfig>,
}

impl Default for ChainTable {
    fn default() -> Self {
        Self::new(default_chains())
    }
}

impl ChainTable {
    pub fn new(chains: Vec<ChainConfig>) -> Self {
        Self { chains }
    }

    /// Returns the configured entry for `id`, if any.
    pub fn get(&self, id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// Resolves display metadata, falling back to the default entry.
    pub fn lookup(&self, id: ChainId) -> ChainMetadata {
        match self.get(id) {
            Some(chain) => ChainMetadata {
                id,
                name: chain.name.clone(),
                explorer_url: chain
                    .block_explorer_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXPLORER_URL.to_string()),
                symbol: chain.native_currency.symbol.clone(),
                known: true,
            },
            None => ChainMetadata {
                id,
                name: "Unknown".into(),
                explorer_url: DEFAULT_EXPLORER_URL.into(),
                symbol: "ETH".into(),
                known: false,
            },
        }
    }

    /// Explorer page for an address on the given chain.
    pub fn explorer_address_url(&self, id: ChainId, address: &str) -> String {
        let base = self.lookup(id).explorer_url;
        format!("{}/address/{address}", base.trim_end_matches('/'))
    }

    pub fn chains(&self) -> &[ChainConfig] {
        &self.chains
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_three_chains() {
        let table = ChainTable::default();
        let ids: Vec<ChainId> = table.chains().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 137, 56]);
    }

    #[test]
    fn lookup_known_chain() {
        let table = ChainTable::default();
        let meta = table.lookup(137);
        assert!(meta.known);
        assert_eq!(meta.name, "Polygon");
        assert_eq!(meta.symbol, "MATIC");
        assert_eq!(meta.explorer_url, "https://polygonscan.com");
    }

    #[test]
    fn lookup_unknown_chain_falls_back() {
        let table = ChainTable::default();
        let meta = table.lookup(424242);
        assert!(!meta.known);
        assert_eq!(meta.id, 424242);
        assert_eq!(meta.name, "Unknown");
        assert_eq!(meta.explorer_url, DEFAULT_EXPLORER_URL);
        assert_eq!(meta.symbol, "ETH");
    }

    #[test]
    fn explorer_urls() {
        let table = ChainTable::default();
        assert_eq!(
            table.explorer_address_url(56, "0xabc"),
            "https://bscscan.com/address/0xabc"
        );
        assert_eq!(
            table.explorer_address_url(999, "0xabc"),
            "https://etherscan.io/address/0xabc"
        );
    }

    #[test]
    fn chain_config_json_shape() {
        let json = serde_json::to_value(&default_chains()[0]).unwrap();
        assert_eq!(json["rpcUrl"], "https://eth-mainnet.g.alchemy.com/v2/your-api-key");
        assert_eq!(json["blockExplorerUrl"], "https://etherscan.io");
        assert_eq!(json["nativeCurrency"]["decimals"], 18);
    }
}
