//! Shared fixtures for detector and scanner tests.
#![allow(dead_code)]

use alloy::primitives::{address, Address, TxHash, B256};
use async_trait::async_trait;
use mev_guard_chain::{
    ChainDataClient, ChainError, ChainResult, ChainTransaction, Log, Network, TransactionReceipt,
    Transfer, TransferDirection,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Uniswap V2 Router02 on Ethereum.
pub const ROUTER: Address = address!("7a250d5630b4cf539739df2c5dacb4c659f2488d");
/// Uniswap SwapRouter02 on Base.
pub const BASE_ROUTER: Address = address!("2626664c2603336e57b271c5c0b26f421741e481");
/// An address no registry knows about.
pub const PLAIN: Address = address!("00000000000000000000000000000000000000aa");

pub fn wallet(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

/// Hash derived from block number and position, unique within a test.
pub fn tx_hash(block: u64, index: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block.to_be_bytes());
    bytes[24..].copy_from_slice(&index.to_be_bytes());
    TxHash::from(bytes)
}

pub fn chain_tx(block: u64, index: u64, from: Address, to: Address) -> ChainTransaction {
    ChainTransaction {
        hash: tx_hash(block, index),
        from,
        to: Some(to),
        block_number: Some(block),
        transaction_index: Some(index),
    }
}

pub fn transfer(hash: TxHash) -> Transfer {
    Transfer {
        hash: Some(hash),
        block_number: None,
        from: None,
        to: None,
        asset: Some("ETH".to_string()),
        value: Some(1.0),
        category: Some("external".to_string()),
    }
}

pub fn swap_receipt(hash: TxHash, topic: B256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(1),
        logs: vec![Log {
            address: PLAIN,
            topics: vec![topic],
        }],
    }
}

/// In-memory chain with per-method call counters.
#[derive(Default)]
pub struct MockChainClient {
    pub network: Network,
    pub ens: HashMap<String, Address>,
    pub outgoing: Vec<Transfer>,
    pub incoming: Vec<Transfer>,
    pub transactions: HashMap<TxHash, ChainTransaction>,
    pub receipts: HashMap<TxHash, TransactionReceipt>,
    pub blocks: HashMap<u64, Vec<ChainTransaction>>,
    /// Blocks whose fetch fails with a timeout.
    pub failing_blocks: HashSet<u64>,
    /// Blocks whose fetch never completes.
    pub hanging_blocks: HashSet<u64>,
    pub transfers_unavailable: bool,
    calls: Mutex<HashMap<String, usize>>,
    tx_lookups: Mutex<HashMap<TxHash, usize>>,
}

impl MockChainClient {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    /// Register a block; every transaction becomes fetchable by hash.
    pub fn with_block(mut self, number: u64, transactions: Vec<ChainTransaction>) -> Self {
        for tx in &transactions {
            self.transactions.insert(tx.hash, tx.clone());
        }
        self.blocks.insert(number, transactions);
        self
    }

    pub fn with_outgoing(mut self, hashes: &[TxHash]) -> Self {
        self.outgoing.extend(hashes.iter().copied().map(transfer));
        self
    }

    pub fn with_incoming(mut self, hashes: &[TxHash]) -> Self {
        self.incoming.extend(hashes.iter().copied().map(transfer));
        self
    }

    pub fn with_receipt(mut self, receipt: TransactionReceipt) -> Self {
        self.receipts.insert(receipt.transaction_hash, receipt);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn lookups_of(&self, hash: &TxHash) -> usize {
        self.tx_lookups
            .lock()
            .unwrap()
            .get(hash)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, method: &str) {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default() += 1;
    }
}

#[async_trait]
impl ChainDataClient for MockChainClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn resolve_ens(&self, name: &str) -> ChainResult<Option<Address>> {
        self.record("resolve_ens");
        Ok(self.ens.get(name).copied())
    }

    async fn get_transfers(
        &self,
        _address: Address,
        direction: TransferDirection,
    ) -> ChainResult<Vec<Transfer>> {
        self.record("get_transfers");
        if self.transfers_unavailable {
            return Err(ChainError::Status(503));
        }
        Ok(match direction {
            TransferDirection::Outgoing => self.outgoing.clone(),
            TransferDirection::Incoming => self.incoming.clone(),
        })
    }

    async fn get_transaction(&self, hash: TxHash) -> ChainResult<Option<ChainTransaction>> {
        self.record("get_transaction");
        *self.tx_lookups.lock().unwrap().entry(hash).or_default() += 1;
        Ok(self.transactions.get(&hash).cloned())
    }

    async fn get_receipt(&self, hash: TxHash) -> ChainResult<Option<TransactionReceipt>> {
        self.record("get_receipt");
        Ok(self.receipts.get(&hash).cloned())
    }

    async fn get_block_transactions(
        &self,
        block_number: u64,
    ) -> ChainResult<Option<Vec<ChainTransaction>>> {
        self.record("get_block_transactions");
        if self.hanging_blocks.contains(&block_number) {
            std::future::pending::<()>().await;
        }
        if self.failing_blocks.contains(&block_number) {
            return Err(ChainError::Timeout {
                method: "eth_getBlockByNumber".to_string(),
            });
        }
        Ok(self.blocks.get(&block_number).cloned())
    }
}
