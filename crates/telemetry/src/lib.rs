//! Observability for the MEV Guard scanner: logging, metrics and audit samples.

pub mod metrics;
pub mod logging;
pub mod audit;

pub use metrics::Metrics;
pub use logging::init_logging;
