//! Runtime configuration from flags and environment.

use anyhow::Context;
use clap::Args;
use mev_guard_annotator::client::DEFAULT_MODEL;
use mev_guard_annotator::{AnnotatorSettings, ReportAnnotator};
use mev_guard_chain::{AlchemyClient, ChainClients, Network, RpcSettings};
use mev_guard_heuristics::dex_registry::parse_router_list;
use mev_guard_heuristics::{
    DetectionMode, DetectorConfig, DexRegistry, ScannerConfig, WalletScanner,
};
use mev_guard_telemetry::Metrics;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Alchemy API key
    #[arg(long, env = "ALCHEMY_API_KEY", hide_env_values = true, global = true)]
    pub alchemy_api_key: Option<String>,

    /// Anthropic API key; narrative summaries fall back to templates without it
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    pub anthropic_api_key: Option<String>,

    /// Model used for narrative summaries
    #[arg(long, env = "ANNOTATOR_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub annotator_model: String,

    /// Network used when a request does not name one
    #[arg(long, env = "NETWORK", default_value = "ethereum", global = true)]
    pub network: Network,

    /// HTTP port for `serve`
    #[arg(long, env = "PORT", default_value_t = 3001, global = true)]
    pub port: u16,

    /// Browser origin allowed by CORS; any origin when unset
    #[arg(long, env = "ALLOWED_ORIGIN", global = true)]
    pub allowed_origin: Option<String>,

    /// Swap classification strictness: precise or thorough
    #[arg(long, env = "DETECTION_MODE", default_value = "precise", global = true)]
    pub detection_mode: DetectionMode,

    /// Transactions searched on each side of the victim
    #[arg(long = "window", env = "DETECTION_WINDOW", global = true)]
    pub window: Option<usize>,

    /// Pause between candidate detections in milliseconds
    #[arg(long, env = "SCAN_DELAY_MS", default_value_t = 200, global = true)]
    pub scan_delay_ms: u64,

    /// Timeout for a single upstream call in milliseconds
    #[arg(long, env = "RPC_TIMEOUT_MS", default_value_t = 10_000, global = true)]
    pub rpc_timeout_ms: u64,

    /// Retries for rate-limited or timed-out upstream calls
    #[arg(long, env = "RPC_MAX_RETRIES", default_value_t = 3, global = true)]
    pub rpc_max_retries: usize,

    /// Comma-separated router addresses added to every network
    #[arg(long = "extra-routers", env = "EXTRA_DEX_ROUTERS", global = true)]
    pub extra_routers: Option<String>,

    /// Log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Append scan reports and analyses as JSON lines to this file
    #[arg(long, env = "AUDIT_OUTPUT", global = true)]
    pub audit_output: Option<PathBuf>,
}

impl Settings {
    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            timeout: Duration::from_millis(self.rpc_timeout_ms),
            max_retries: self.rpc_max_retries,
            ..RpcSettings::default()
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::new(self.detection_mode, self.window)
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            candidate_delay: Duration::from_millis(self.scan_delay_ms),
            ..ScannerConfig::default()
        }
    }

    pub fn annotator(&self) -> ReportAnnotator {
        ReportAnnotator::from_settings(AnnotatorSettings {
            api_key: self.anthropic_api_key.clone(),
            model: self.annotator_model.clone(),
            ..AnnotatorSettings::default()
        })
    }

    pub fn registry(&self) -> anyhow::Result<DexRegistry> {
        let extra = match self.extra_routers.as_deref() {
            Some(raw) => parse_router_list(raw).context("invalid EXTRA_DEX_ROUTERS")?,
            None => Vec::new(),
        };
        Ok(Network::ALL
            .into_iter()
            .fold(DexRegistry::new(), |registry, network| {
                registry.with_extra_routers(network, extra.iter().copied())
            }))
    }

    /// Provider clients for every network.
    pub fn chain_clients(&self, metrics: &Metrics) -> anyhow::Result<ChainClients> {
        let api_key = self
            .alchemy_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .context("ALCHEMY_API_KEY is required")?;

        let client = |network| -> anyhow::Result<Arc<AlchemyClient>> {
            Ok(Arc::new(AlchemyClient::new(
                network,
                api_key,
                self.rpc_settings(),
                metrics.clone(),
            )?))
        };
        Ok(ChainClients::new(
            client(Network::Ethereum)?,
            client(Network::Base)?,
        ))
    }

    /// Wire the scanner from these settings.
    pub fn build_scanner(&self, metrics: Metrics) -> anyhow::Result<WalletScanner> {
        let clients = self.chain_clients(&metrics)?;
        let detector_config = self.detector_config();
        let annotator = self.annotator();
        info!(
            mode = %detector_config.mode,
            window = detector_config.window,
            default_network = %self.network,
            narrative = annotator.is_enabled(),
            "Scanner configured"
        );

        Ok(WalletScanner::new(
            clients,
            Arc::new(self.registry()?),
            detector_config,
            self.scanner_config(),
            annotator,
            metrics,
        ))
    }
}
