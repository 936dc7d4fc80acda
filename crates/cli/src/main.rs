//! `mev-guard`: sandwich attack scanner for Ethereum and Base wallets.

mod api;
mod config;

use api::AppState;
use clap::{Parser, Subcommand};
use config::Settings;
use mev_guard_heuristics::input::parse_tx_hash;
use mev_guard_heuristics::WalletScanner;
use mev_guard_telemetry::audit::write_audit_sample;
use mev_guard_telemetry::{init_logging, Metrics};
use serde::Serialize;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "mev-guard")]
#[command(about = "Detect sandwich attacks against a wallet's DEX swaps")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Scan a wallet address or ENS name and print the report
    Scan {
        /// 0x-prefixed address or name ending in .eth
        target: String,

        /// Maximum DEX candidates to evaluate
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check a single transaction for a sandwich
    Tx {
        /// 0x-prefixed 32-byte transaction hash
        hash: String,
    },
    /// Print the block window around a transaction without a verdict
    Context {
        /// 0x-prefixed 32-byte transaction hash
        hash: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let settings = cli.settings;

    init_logging(settings.log_level.as_deref())?;
    let scanner = settings.build_scanner(Metrics::new()?)?;

    match cli.command {
        Commands::Serve => serve(&settings, scanner).await?,
        Commands::Scan { target, limit } => scan(&settings, &scanner, &target, limit).await?,
        Commands::Tx { hash } => {
            let hash = parse_tx_hash(&hash)?;
            let analysis = api::analyze_with_explanation(&scanner, settings.network, hash).await?;
            write_audit_sample(settings.audit_output.as_ref(), &analysis)?;
            print_json(&analysis)?;
        }
        Commands::Context { hash } => {
            let hash = parse_tx_hash(&hash)?;
            let context = scanner
                .detector(settings.network)
                .block_context(hash)
                .await?;
            print_json(&context)?;
        }
    }

    Ok(())
}

async fn serve(settings: &Settings, scanner: WalletScanner) -> anyhow::Result<()> {
    let state = AppState {
        scanner,
        default_network: settings.network,
        audit_output: settings.audit_output.clone(),
    };
    let app = api::router(state, settings.allowed_origin.as_deref())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        origin = settings.allowed_origin.as_deref().unwrap_or("*"),
        "MEV Guard API listening on http://{}", addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("MEV Guard API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn scan(
    settings: &Settings,
    scanner: &WalletScanner,
    target: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, reporting partial results");
            interrupt.cancel();
        }
    });

    let report = scanner
        .scan(target, settings.network, limit, &cancel)
        .await?;
    write_audit_sample(settings.audit_output.as_ref(), &report)?;
    print_json(&report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
