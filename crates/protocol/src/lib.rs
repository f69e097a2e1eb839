pub mod account;
pub mod address;
pub mod chains;
pub mod constants;
pub mod device;
pub mod error;
pub mod types;

// Re-export primary types for convenience.
pub use account::{NamespacedAccount, parse_hex_chain_id, to_hex_chain_id};
pub use address::{format_address, is_valid_address, is_valid_chain_id};
pub use chains::{ChainConfig, ChainMetadata, ChainTable, NativeCurrency, default_chains};
pub use constants::ProviderEventKind;
pub use device::DeviceInfo;
pub use error::{ConnectError, ParseError};
pub use types::{ChainId, ConnectResult, Connection, ConnectorInfo};
