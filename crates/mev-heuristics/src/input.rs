//! Shape validation for user-supplied addresses, ENS names and hashes.

use alloy::primitives::{Address, TxHash};
use std::str::FromStr;

use crate::error::{ScanError, ScanResult};

/// Top-level label handled by the ENS registrar.
pub const ENS_SUFFIX: &str = ".eth";

/// What a scan request points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    Address(Address),
    Ens(String),
}

impl ScanTarget {
    /// Classify raw input as an ENS name or a hex address.
    pub fn parse(input: &str) -> ScanResult<Self> {
        let input = input.trim();
        if is_ens_name(input) {
            return Ok(ScanTarget::Ens(input.to_lowercase()));
        }
        parse_address(input).map(ScanTarget::Address)
    }
}

/// `true` for `name.eth`-shaped input (case-insensitive suffix, non-empty labels).
pub fn is_ens_name(input: &str) -> bool {
    let lower = input.to_lowercase();
    let Some(stem) = lower.strip_suffix(ENS_SUFFIX) else {
        return false;
    };
    !stem.is_empty()
        && stem.split('.').all(|label| !label.is_empty())
        && !lower.chars().any(|c| c.is_whitespace() || c == '/')
}

fn is_hex_of_len(input: &str, digits: usize) -> bool {
    input.len() == digits + 2
        && (input.starts_with("0x") || input.starts_with("0X"))
        && input[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// `true` for a `0x`-prefixed 40 hex digit string.
pub fn is_address(input: &str) -> bool {
    is_hex_of_len(input, 40)
}

/// `true` for a `0x`-prefixed 64 hex digit string.
pub fn is_tx_hash(input: &str) -> bool {
    is_hex_of_len(input, 64)
}

pub fn parse_address(input: &str) -> ScanResult<Address> {
    if !is_address(input) {
        return Err(ScanError::Validation(
            "Invalid input. Please enter a valid Ethereum address (0x...) or ENS name (*.eth)"
                .to_string(),
        ));
    }
    Address::from_str(&input[2..]).map_err(|e| ScanError::Validation(e.to_string()))
}

pub fn parse_tx_hash(input: &str) -> ScanResult<TxHash> {
    let input = input.trim();
    if !is_tx_hash(input) {
        return Err(ScanError::Validation("Invalid tx hash".to_string()));
    }
    TxHash::from_str(&input[2..]).map_err(|e| ScanError::Validation(e.to_string()))
}
