//! Error taxonomy for detection and scanning.

use alloy::primitives::TxHash;
use mev_guard_chain::ChainError;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Malformed address, hash, ENS name or parameter.
    #[error("{0}")]
    Validation(String),
    #[error("could not resolve ENS name '{0}'")]
    Resolution(String),
    #[error("upstream provider error: {0}")]
    Upstream(#[from] ChainError),
    #[error("{0} not found")]
    NotFound(String),
    /// The provider returned a block that does not contain the transaction
    /// it claimed was mined in it.
    #[error("transaction {tx_hash} is not present in its reported block {block_number}")]
    InconsistentState { tx_hash: TxHash, block_number: u64 },
}

impl ScanError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ScanError::Upstream(ChainError::Timeout { .. }))
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
