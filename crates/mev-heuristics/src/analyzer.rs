//! Single-transaction sandwich detection against live block data.

use alloy::primitives::TxHash;
use mev_guard_chain::{ChainDataClient, ChainTransaction, Network};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::detectors::{
    find_sandwich, locate, sender_pairs, DetectionMode, DetectorConfig, SandwichMatch,
    SearchWindow,
};
use crate::dex_registry::DexRegistry;
use crate::error::{ScanError, ScanResult};
use crate::models::{AttackType, BlockContext, SandwichAttack, TransactionAnalysis, TxRef};

/// A mined transaction together with the block that contains it.
struct LoadedBlock {
    number: u64,
    transactions: Vec<ChainTransaction>,
    victim_index: usize,
}

/// Decides whether a transaction was sandwiched, for one network.
#[derive(Clone)]
pub struct SandwichDetector {
    client: Arc<dyn ChainDataClient>,
    registry: Arc<DexRegistry>,
    config: DetectorConfig,
}

impl SandwichDetector {
    pub fn new(
        client: Arc<dyn ChainDataClient>,
        registry: Arc<DexRegistry>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            client,
            registry,
            config,
        }
    }

    pub fn network(&self) -> Network {
        self.client.network()
    }

    pub fn config(&self) -> DetectorConfig {
        self.config
    }

    /// Fetch `hash` and check its block for a sandwich.
    pub async fn detect(&self, hash: TxHash) -> ScanResult<TransactionAnalysis> {
        let tx = self.mined_transaction(hash).await?;
        self.detect_transaction(&tx).await
    }

    /// Check the block of an already-fetched transaction for a sandwich.
    pub async fn detect_transaction(
        &self,
        tx: &ChainTransaction,
    ) -> ScanResult<TransactionAnalysis> {
        let loaded = self.load_block(tx).await?;
        let block = &loaded.transactions;
        let window = SearchWindow::new(block.len(), loaded.victim_index, self.config.window);
        let network = self.network();

        let found = match self.config.mode {
            DetectionMode::Precise => find_sandwich(block, window, |candidate| {
                self.registry.touches_router(network, candidate)
            }),
            DetectionMode::Thorough => self.find_sandwich_with_receipts(block, window).await?,
        };

        let attack = found.map(|m| {
            let frontrun = &block[m.frontrun_index];
            let backrun = &block[m.backrun_index];
            SandwichAttack {
                victim_tx_hash: tx.hash,
                frontrun_tx_hash: frontrun.hash,
                backrun_tx_hash: backrun.hash,
                attacker_address: frontrun.from,
                victim_address: tx.from,
                block_number: loaded.number,
                frontrun_index: m.frontrun_index as u64,
                victim_index: loaded.victim_index as u64,
                backrun_index: m.backrun_index as u64,
                victim_loss_usd: Decimal::ZERO,
                attacker_profit_usd: Decimal::ZERO,
                loss_is_estimate: true,
                timestamp: chrono::Utc::now().timestamp_millis(),
            }
        });

        match &attack {
            Some(a) => info!(
                network = %network,
                tx_hash = %tx.hash,
                block = loaded.number,
                attacker = %a.attacker_address,
                frontrun_index = a.frontrun_index,
                backrun_index = a.backrun_index,
                "Sandwich detected"
            ),
            None => debug!(
                network = %network,
                tx_hash = %tx.hash,
                block = loaded.number,
                victim_index = loaded.victim_index,
                "No sandwich around transaction"
            ),
        }

        Ok(TransactionAnalysis {
            tx_hash: tx.hash,
            network,
            block_number: loaded.number,
            victim_index: loaded.victim_index as u64,
            block_size: block.len(),
            window: self.config.window,
            is_mev_attack: attack.is_some(),
            attack_type: if attack.is_some() {
                AttackType::Sandwich
            } else {
                AttackType::None
            },
            attack,
            ai_explanation: None,
            recommendations: Vec::new(),
        })
    }

    /// Whether `tx` counts as DEX-directed under the configured mode.
    ///
    /// Router membership is checked first. Only thorough mode falls back to
    /// the receipt, and only when the membership check fails.
    pub async fn is_swap_candidate(&self, tx: &ChainTransaction) -> ScanResult<bool> {
        if self.registry.touches_router(self.network(), tx) {
            return Ok(true);
        }
        if self.config.mode == DetectionMode::Precise {
            return Ok(false);
        }
        Ok(self
            .client
            .get_receipt(tx.hash)
            .await?
            .is_some_and(|receipt| self.registry.is_swap_receipt(&receipt)))
    }

    /// The window around `hash` without a verdict.
    pub async fn block_context(&self, hash: TxHash) -> ScanResult<BlockContext> {
        let tx = self.mined_transaction(hash).await?;
        let loaded = self.load_block(&tx).await?;
        let block = &loaded.transactions;
        let window = SearchWindow::new(block.len(), loaded.victim_index, self.config.window);

        let tx_ref = |index: usize| self.tx_ref(&block[index], loaded.number, index);

        Ok(BlockContext {
            network: self.network(),
            block_number: loaded.number,
            block_size: block.len(),
            victim_index: loaded.victim_index as u64,
            window: self.config.window,
            victim: tx_ref(loaded.victim_index),
            before: window.before().map(tx_ref).collect(),
            after: window.after().map(tx_ref).collect(),
        })
    }

    fn tx_ref(&self, tx: &ChainTransaction, block_number: u64, index: usize) -> TxRef {
        let network = self.network();
        let mut tx_ref = TxRef::new(tx, block_number, index as u64);
        tx_ref.touches_router = self.registry.touches_router(network, tx);
        tx_ref.router = tx
            .to
            .and_then(|to| self.registry.router_name(network, &to))
            .map(str::to_string);
        tx_ref
    }

    /// Same pairing as [`find_sandwich`], but classification may need a
    /// receipt. Results are memoised per block position and both sides of a
    /// pair are classified concurrently.
    async fn find_sandwich_with_receipts(
        &self,
        block: &[ChainTransaction],
        window: SearchWindow,
    ) -> ScanResult<Option<SandwichMatch>> {
        let mut classified: HashMap<usize, bool> = HashMap::new();

        for (f, b) in sender_pairs(block, window) {
            let known_front = classified.get(&f).copied();
            let known_back = classified.get(&b).copied();
            if known_front == Some(false) || known_back == Some(false) {
                continue;
            }

            let (front, back) = tokio::try_join!(
                self.classify_cached(known_front, &block[f]),
                self.classify_cached(known_back, &block[b]),
            )?;
            classified.insert(f, front);
            classified.insert(b, back);

            if front && back {
                return Ok(Some(SandwichMatch {
                    frontrun_index: f,
                    backrun_index: b,
                }));
            }
        }
        Ok(None)
    }

    async fn classify_cached(
        &self,
        cached: Option<bool>,
        tx: &ChainTransaction,
    ) -> ScanResult<bool> {
        match cached {
            Some(known) => Ok(known),
            None => self.is_swap_candidate(tx).await,
        }
    }

    async fn mined_transaction(&self, hash: TxHash) -> ScanResult<ChainTransaction> {
        match self.client.get_transaction(hash).await? {
            Some(tx) if tx.is_confirmed() => Ok(tx),
            Some(_) => Err(ScanError::NotFound(format!("mined transaction {}", hash))),
            None => Err(ScanError::NotFound(format!("transaction {}", hash))),
        }
    }

    async fn load_block(&self, tx: &ChainTransaction) -> ScanResult<LoadedBlock> {
        let number = tx
            .block_number
            .ok_or_else(|| ScanError::NotFound(format!("mined transaction {}", tx.hash)))?;

        let transactions = self
            .client
            .get_block_transactions(number)
            .await?
            .ok_or_else(|| ScanError::NotFound(format!("block {}", number)))?;

        let victim_index =
            locate(&transactions, &tx.hash).ok_or(ScanError::InconsistentState {
                tx_hash: tx.hash,
                block_number: number,
            })?;

        Ok(LoadedBlock {
            number,
            transactions,
            victim_index,
        })
    }
}
