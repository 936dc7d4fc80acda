//! ENS name hashing and call encoding.
//!
//! Resolution is two `eth_call`s: the registry returns the resolver for a
//! node, and the resolver returns the address record.

use alloy::primitives::{address, keccak256, Address, B256};

use crate::error::ChainError;

/// ENS registry, deployed at the same address on mainnet since the 2020 migration.
pub const ENS_REGISTRY: Address = address!("00000000000c2e074ec69a0bfb2997ba6c7d2e1e");

/// `resolver(bytes32)`
pub const RESOLVER_SELECTOR: [u8; 4] = [0x01, 0x78, 0xb8, 0xbf];

/// `addr(bytes32)`
pub const ADDR_SELECTOR: [u8; 4] = [0x3b, 0x3b, 0x57, 0xde];

/// Lower-case and trim a name. Full UTS-46 normalisation is not applied.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// EIP-137 namehash of an already normalised name.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Hex calldata for a single-`bytes32` argument call.
pub fn encode_node_call(selector: [u8; 4], node: B256) -> String {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector);
    data.extend_from_slice(node.as_slice());
    format!("0x{}", hex::encode(data))
}

/// Decode an ABI-encoded `address` return value. The zero address means
/// "no record" and decodes to `None`.
pub fn decode_address_word(raw: &str) -> Result<Option<Address>, ChainError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(None);
    }
    let bytes = hex::decode(digits)
        .map_err(|e| ChainError::Decode(format!("eth_call returned invalid hex: {}", e)))?;
    if bytes.len() < 32 {
        return Err(ChainError::Decode(format!(
            "eth_call returned {} bytes, expected an address word",
            bytes.len()
        )));
    }
    let addr = Address::from_slice(&bytes[12..32]);
    Ok((addr != Address::ZERO).then_some(addr))
}
