//! Address and chain id helpers.

use crate::types::ChainId;

/// Shortens an address to `0x1234...5678`, keeping `chars` characters on each
/// side of the prefix.
///
/// Addresses too short to shorten are returned unchanged.
pub fn format_address(address: &str, chars: usize) -> String {
    if address.is_empty() {
        return String::new();
    }
    let head = chars + 2;
    if address.len() <= head + chars || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..head], &address[address.len() - chars..])
}

/// Returns true for a `0x`-prefixed, 40-hex-digit address.
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
        None => false,
    }
}

/// Chain ids are positive integers.
pub fn is_valid_chain_id(chain_id: ChainId) -> bool {
    chain_id > 0
}
