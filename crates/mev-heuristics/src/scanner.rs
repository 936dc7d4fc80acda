//! Wallet-scan orchestration: transfer history to DEX candidates to a
//! risk-scored report.

use alloy::primitives::{Address, TxHash};
use mev_guard_annotator::ReportAnnotator;
use mev_guard_chain::{ChainClients, ChainTransaction, Network, TransferDirection};
use mev_guard_telemetry::Metrics;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analyzer::SandwichDetector;
use crate::detectors::DetectorConfig;
use crate::dex_registry::DexRegistry;
use crate::error::{ScanError, ScanResult};
use crate::input::ScanTarget;
use crate::models::{RiskLevel, SandwichAttack, ScanReport};

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Candidate limit when the caller gives none.
    pub default_limit: usize,
    /// Upper bound on any requested limit.
    pub max_limit: usize,
    /// Pause between consecutive candidate detections.
    pub candidate_delay: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            default_limit: 30,
            max_limit: 50,
            candidate_delay: Duration::from_millis(200),
        }
    }
}

/// Scans wallets for sandwiched swaps.
///
/// Holds no per-scan state; concurrent scans share only the read-only
/// registry and the clients.
#[derive(Clone)]
pub struct WalletScanner {
    clients: ChainClients,
    registry: Arc<DexRegistry>,
    detector_config: DetectorConfig,
    config: ScannerConfig,
    annotator: ReportAnnotator,
    metrics: Metrics,
}

/// Running totals for one scan.
#[derive(Default)]
struct Tally {
    /// Candidates run through the detector, failed ones included.
    candidates: usize,
    skipped: usize,
    attacks: Vec<SandwichAttack>,
    cancelled: bool,
}

impl WalletScanner {
    pub fn new(
        clients: ChainClients,
        registry: Arc<DexRegistry>,
        detector_config: DetectorConfig,
        config: ScannerConfig,
        annotator: ReportAnnotator,
        metrics: Metrics,
    ) -> Self {
        Self {
            clients,
            registry,
            detector_config,
            config,
            annotator,
            metrics,
        }
    }

    /// Detector bound to `network`.
    pub fn detector(&self, network: Network) -> SandwichDetector {
        SandwichDetector::new(
            self.clients.get(network),
            Arc::clone(&self.registry),
            self.detector_config,
        )
    }

    pub fn annotator(&self) -> &ReportAnnotator {
        &self.annotator
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Apply the default and the upper bound to a requested limit.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit.max(1))
    }

    /// Scan an address or ENS name.
    pub async fn scan(
        &self,
        input: &str,
        network: Network,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> ScanResult<ScanReport> {
        let target = ScanTarget::parse(input)?;
        self.scan_target(target, network, limit, cancel).await
    }

    /// Scan an already-classified target.
    ///
    /// Fails only on resolution and transfer-history errors. A failing
    /// candidate is logged and counted as skipped. Cancellation stops the
    /// loop and returns the partial aggregate with `cancelled` set.
    pub async fn scan_target(
        &self,
        target: ScanTarget,
        network: Network,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> ScanResult<ScanReport> {
        let limit = self.clamp_limit(limit);
        let (wallet, ens_name) = self.resolve(target).await?;
        self.metrics.inc_scans();
        info!(wallet = %wallet, network = %network, limit, "Starting wallet scan");

        let detector = self.detector(network);
        let mut tally = Tally::default();

        match until_cancelled(cancel, self.transfer_hashes(network, wallet)).await {
            None => tally.cancelled = true,
            Some(hashes) => {
                let hashes = hashes?;
                match until_cancelled(cancel, self.collect_candidates(&detector, &hashes, limit))
                    .await
                {
                    None => tally.cancelled = true,
                    Some(candidates) => {
                        self.metrics.inc_dex_candidates(candidates.len() as u64);
                        self.evaluate(&detector, &candidates, cancel, &mut tally).await;
                    }
                }
            }
        }

        let mut report = ScanReport {
            wallet_address: wallet,
            ens_name,
            network,
            total_transactions: tally.candidates,
            attacked_transactions: tally.attacks.len(),
            skipped_transactions: tally.skipped,
            total_loss_usd: tally
                .attacks
                .iter()
                .map(|a| a.victim_loss_usd)
                .sum::<Decimal>(),
            risk_level: RiskLevel::from_counts(tally.attacks.len(), tally.candidates),
            attacks: tally.attacks,
            ai_report: None,
            scan_timestamp: chrono::Utc::now().timestamp_millis(),
            cancelled: tally.cancelled,
        };
        self.metrics
            .inc_sandwiches_detected(report.attacked_transactions as u64);

        if !report.cancelled {
            report.ai_report = Some(self.annotator.summarize(&report.summary()).await);
        }

        info!(
            wallet = %wallet,
            network = %network,
            candidates = report.total_transactions,
            attacked = report.attacked_transactions,
            skipped = report.skipped_transactions,
            risk = %report.risk_level,
            cancelled = report.cancelled,
            "Wallet scan finished"
        );
        Ok(report)
    }

    async fn resolve(&self, target: ScanTarget) -> ScanResult<(Address, Option<String>)> {
        match target {
            ScanTarget::Address(address) => Ok((address, None)),
            ScanTarget::Ens(name) => {
                let resolved = self.clients.ens().resolve_ens(&name).await?;
                match resolved {
                    Some(address) => {
                        debug!(name = %name, address = %address, "Resolved ENS name");
                        Ok((address, Some(name)))
                    }
                    None => Err(ScanError::Resolution(name)),
                }
            }
        }
    }

    /// Unique transaction hashes from both transfer directions, outgoing
    /// first, each in provider order.
    async fn transfer_hashes(&self, network: Network, wallet: Address) -> ScanResult<Vec<TxHash>> {
        let client = self.clients.get(network);
        let outgoing = client
            .get_transfers(wallet, TransferDirection::Outgoing)
            .await?;
        let incoming = client
            .get_transfers(wallet, TransferDirection::Incoming)
            .await?;

        let mut seen = HashSet::new();
        let hashes: Vec<TxHash> = outgoing
            .iter()
            .chain(incoming.iter())
            .filter_map(|t| t.hash)
            .filter(|hash| seen.insert(*hash))
            .collect();

        debug!(
            wallet = %wallet,
            transfers = outgoing.len() + incoming.len(),
            unique = hashes.len(),
            "Collected transfer history"
        );
        Ok(hashes)
    }

    /// Mined swap candidates among `hashes`, stopping at `limit`.
    async fn collect_candidates(
        &self,
        detector: &SandwichDetector,
        hashes: &[TxHash],
        limit: usize,
    ) -> Vec<ChainTransaction> {
        let client = self.clients.get(detector.network());
        let mut candidates = Vec::new();

        for hash in hashes {
            if candidates.len() >= limit {
                break;
            }
            let tx = match client.get_transaction(*hash).await {
                Ok(Some(tx)) if tx.is_confirmed() => tx,
                Ok(_) => {
                    debug!(tx_hash = %hash, "Skipping unmined or unknown transaction");
                    continue;
                }
                Err(e) => {
                    warn!(tx_hash = %hash, error = %e, "Failed to fetch transaction, skipping");
                    continue;
                }
            };
            match detector.is_swap_candidate(&tx).await {
                Ok(true) => candidates.push(tx),
                Ok(false) => {}
                Err(e) => {
                    warn!(tx_hash = %hash, error = %e, "Failed to classify transaction, skipping");
                }
            }
        }
        candidates
    }

    /// Run the detector over each candidate in order, pausing between them.
    async fn evaluate(
        &self,
        detector: &SandwichDetector,
        candidates: &[ChainTransaction],
        cancel: &CancellationToken,
        tally: &mut Tally,
    ) {
        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0
                && until_cancelled(cancel, tokio::time::sleep(self.config.candidate_delay))
                    .await
                    .is_none()
            {
                tally.cancelled = true;
                return;
            }

            match until_cancelled(cancel, detector.detect_transaction(candidate)).await {
                None => {
                    tally.cancelled = true;
                    return;
                }
                Some(Ok(analysis)) => {
                    tally.candidates += 1;
                    tally.attacks.extend(analysis.attack);
                }
                Some(Err(e)) => {
                    tally.candidates += 1;
                    tally.skipped += 1;
                    self.metrics.inc_candidate_failures();
                    warn!(
                        tx_hash = %candidate.hash,
                        error = %e,
                        timeout = e.is_timeout(),
                        "Detection failed for candidate, skipping"
                    );
                }
            }
        }
    }
}

/// Drive `fut` unless `cancel` fires first, in which case `fut` is dropped.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}
