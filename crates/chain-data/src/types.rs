//! Provider data types.
//!
//! These mirror the subset of the JSON-RPC payloads the detector needs.
//! Quantities arrive as `0x`-prefixed hex strings and are decoded to `u64`.

use alloy::primitives::{Address, TxHash, B256};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ChainError;

/// A transaction as returned by `eth_getTransactionByHash` or inside a full block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub hash: TxHash,
    pub from: Address,
    /// `None` for contract creation.
    #[serde(default)]
    pub to: Option<Address>,
    /// `None` while the transaction is pending.
    #[serde(default, deserialize_with = "deserialize_opt_quantity")]
    pub block_number: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_quantity")]
    pub transaction_index: Option<u64>,
}

impl ChainTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.block_number.is_some()
    }
}

/// An event log entry from a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
}

impl Log {
    /// The event signature topic, if the log has one.
    pub fn signature(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// The subset of a transaction receipt used for swap-event inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    #[serde(default, deserialize_with = "deserialize_opt_quantity")]
    pub status: Option<u64>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    /// Whether any log carries one of the given event signatures.
    pub fn emits_any(&self, signatures: &[B256]) -> bool {
        self.logs
            .iter()
            .filter_map(Log::signature)
            .any(|topic| signatures.contains(topic))
    }
}

/// Which side of a transfer the wallet is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    Outgoing,
    Incoming,
}

/// A single transfer record from the wallet history endpoint.
///
/// One transaction can produce several of these (for example a native
/// transfer and a token transfer in the same swap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(default)]
    pub hash: Option<TxHash>,
    #[serde(default, rename = "blockNum", deserialize_with = "deserialize_opt_quantity")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Parse a JSON-RPC quantity (`0x`-prefixed hex) into a `u64`.
pub fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| ChainError::Decode(format!("quantity '{}' is missing 0x prefix", raw)))?;
    if digits.is_empty() {
        return Err(ChainError::Decode(format!("empty quantity '{}'", raw)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("invalid quantity '{}': {}", raw, e)))
}

/// Format a `u64` as a JSON-RPC quantity.
pub fn format_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

fn deserialize_opt_quantity<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => parse_quantity(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid quantity {}", n))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "unexpected quantity {}",
            other
        ))),
    }
}
