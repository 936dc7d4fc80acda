//! Sandwich attack detection for wallet histories and single transactions.

pub mod analyzer;
pub mod detectors;
pub mod dex_registry;
pub mod error;
pub mod input;
pub mod models;
pub mod scanner;

pub use analyzer::SandwichDetector;
pub use detectors::{DetectionMode, DetectorConfig};
pub use dex_registry::DexRegistry;
pub use error::{ScanError, ScanResult};
pub use input::ScanTarget;
pub use models::{
    AttackType, BlockContext, RiskLevel, SandwichAttack, ScanReport, TransactionAnalysis, TxRef,
};
pub use scanner::{ScannerConfig, WalletScanner};
