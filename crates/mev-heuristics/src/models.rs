//! Detection results and scan reports.

use alloy::primitives::{Address, TxHash};
use mev_guard_annotator::{AttackContext, AttackExplanation, ScanSummary};
use mev_guard_chain::{ChainTransaction, Network};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transaction located inside its block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRef {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub block_number: u64,
    /// 0-based position within the block.
    pub position: u64,
    pub touches_router: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
}

impl TxRef {
    pub fn new(tx: &ChainTransaction, block_number: u64, position: u64) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            block_number,
            position,
            touches_router: false,
            router: None,
        }
    }
}

/// A detected sandwich around a victim transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandwichAttack {
    pub victim_tx_hash: TxHash,
    pub frontrun_tx_hash: TxHash,
    pub backrun_tx_hash: TxHash,
    pub attacker_address: Address,
    pub victim_address: Address,
    pub block_number: u64,
    pub frontrun_index: u64,
    pub victim_index: u64,
    pub backrun_index: u64,
    /// Placeholder; no price data is consulted.
    #[serde(rename = "victimLossUSD", with = "rust_decimal::serde::str")]
    pub victim_loss_usd: Decimal,
    #[serde(rename = "attackerProfitUSD", with = "rust_decimal::serde::str")]
    pub attacker_profit_usd: Decimal,
    pub loss_is_estimate: bool,
    /// Milliseconds since the Unix epoch at detection time.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
    Sandwich,
    None,
}

/// Verdict for a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub tx_hash: TxHash,
    pub network: Network,
    pub block_number: u64,
    pub victim_index: u64,
    pub block_size: usize,
    /// Effective search width on each side of the victim.
    pub window: usize,
    #[serde(rename = "isMEVAttack")]
    pub is_mev_attack: bool,
    pub attack_type: AttackType,
    pub attack: Option<SandwichAttack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl TransactionAnalysis {
    /// Input for the narrative annotator.
    pub fn attack_context(&self, victim_address: Address) -> AttackContext {
        AttackContext {
            victim_tx_hash: self.tx_hash.to_string(),
            block_number: self.block_number,
            victim_address: victim_address.to_string(),
            frontrun_hash: self.attack.as_ref().map(|a| a.frontrun_tx_hash.to_string()),
            backrun_hash: self.attack.as_ref().map(|a| a.backrun_tx_hash.to_string()),
            attacker_address: self.attack.as_ref().map(|a| a.attacker_address.to_string()),
        }
    }

    pub fn with_explanation(mut self, explanation: AttackExplanation) -> Self {
        self.ai_explanation = Some(explanation.explanation);
        self.recommendations = explanation.recommendations;
        self
    }
}

/// Raw neighbourhood of a transaction, without a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
    pub network: Network,
    pub block_number: u64,
    pub block_size: usize,
    pub victim_index: u64,
    pub window: usize,
    pub victim: TxRef,
    pub before: Vec<TxRef>,
    pub after: Vec<TxRef>,
}

/// Wallet risk tier derived from the share of attacked swaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `High` at 10% or more attacked, `Medium` at 5% or more, else `Low`.
    /// No candidates counts as a 0% rate.
    pub fn from_counts(attacked: usize, total: usize) -> Self {
        if total == 0 {
            return RiskLevel::Low;
        }
        let percent = attacked as u128 * 100;
        let total = total as u128;
        if percent >= total * 10 {
            RiskLevel::High
        } else if percent >= total * 5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scanning one wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub wallet_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens_name: Option<String>,
    pub network: Network,
    /// DEX candidates, including those whose detection failed.
    pub total_transactions: usize,
    pub attacked_transactions: usize,
    /// Candidates whose detection failed; they count toward the total but
    /// cannot contribute attacks.
    pub skipped_transactions: usize,
    #[serde(rename = "totalLossUSD", with = "rust_decimal::serde::str")]
    pub total_loss_usd: Decimal,
    pub attacks: Vec<SandwichAttack>,
    pub risk_level: RiskLevel,
    pub ai_report: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub scan_timestamp: i64,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            wallet_address: self
                .ens_name
                .clone()
                .unwrap_or_else(|| self.wallet_address.to_string()),
            total_transactions: self.total_transactions,
            attacked_transactions: self.attacked_transactions,
            total_loss_usd: self.total_loss_usd.to_string(),
            risk_level: self.risk_level.to_string(),
        }
    }
}
