//! Wallet connection session.
//!
//! Holds the connection state store, the bridge that feeds backend change
//! notifications into it, the advisory wallet list and configuration.

mod bridge;
pub mod config;
pub mod store;
pub mod types;
pub mod wallets;

pub use bridge::BridgeSubscription;
pub use config::{ConfigError, WalletConfig, default_config_path};
pub use store::ConnectionStore;
pub use types::{ConnectionSnapshot, StoreError};
pub use wallets::AvailableWallets;
