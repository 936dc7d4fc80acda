//! Provider interface consumed by the detector and the wallet scanner.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ChainResult;
use crate::network::Network;
use crate::types::{ChainTransaction, TransactionReceipt, Transfer, TransferDirection};

/// Typed access to the data a sandwich scan needs.
///
/// Implementations are bound to a single [`Network`]. `Ok(None)` means the
/// provider answered and the object does not exist; transport and decoding
/// failures are errors.
#[async_trait]
pub trait ChainDataClient: Send + Sync {
    /// The network this client reads from.
    fn network(&self) -> Network;

    /// Resolve an ENS name to an address.
    async fn resolve_ens(&self, name: &str) -> ChainResult<Option<Address>>;

    /// Most recent transfers sent or received by `address`, newest first.
    async fn get_transfers(
        &self,
        address: Address,
        direction: TransferDirection,
    ) -> ChainResult<Vec<Transfer>>;

    async fn get_transaction(&self, hash: TxHash) -> ChainResult<Option<ChainTransaction>>;

    async fn get_receipt(&self, hash: TxHash) -> ChainResult<Option<TransactionReceipt>>;

    /// All transactions of a block in canonical on-chain order.
    async fn get_block_transactions(
        &self,
        block_number: u64,
    ) -> ChainResult<Option<Vec<ChainTransaction>>>;
}

/// One client per supported network.
#[derive(Clone)]
pub struct ChainClients {
    ethereum: Arc<dyn ChainDataClient>,
    base: Arc<dyn ChainDataClient>,
}

impl ChainClients {
    pub fn new(ethereum: Arc<dyn ChainDataClient>, base: Arc<dyn ChainDataClient>) -> Self {
        Self { ethereum, base }
    }

    /// The client for `network`.
    pub fn get(&self, network: Network) -> Arc<dyn ChainDataClient> {
        match network {
            Network::Ethereum => Arc::clone(&self.ethereum),
            Network::Base => Arc::clone(&self.base),
        }
    }

    /// The client used for ENS lookups. ENS lives on Ethereum mainnet
    /// regardless of which network is being scanned.
    pub fn ens(&self) -> Arc<dyn ChainDataClient> {
        Arc::clone(&self.ethereum)
    }
}
