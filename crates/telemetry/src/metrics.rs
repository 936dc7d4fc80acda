//! Prometheus metrics for wallet scans and upstream provider calls.

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_with_registry, Encoder,
    HistogramVec, IntCounter, Registry, TextEncoder,
};

/// Metrics collector for the MEV Guard service.
///
/// Every instance owns its registry, so independent instances (one per
/// process, one per test) never collide on metric names.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    scans: IntCounter,
    dex_candidates: IntCounter,
    sandwiches_detected: IntCounter,
    candidate_failures: IntCounter,
    rpc_errors: IntCounter,
    rpc_latency: HistogramVec,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let scans = register_int_counter_with_registry!(
            "mev_guard_scans_total",
            "Total number of wallet scans completed",
            registry
        )?;

        let dex_candidates = register_int_counter_with_registry!(
            "mev_guard_dex_candidates_total",
            "Total number of DEX candidate transactions evaluated",
            registry
        )?;

        let sandwiches_detected = register_int_counter_with_registry!(
            "mev_guard_sandwiches_detected_total",
            "Total number of sandwich attacks detected",
            registry
        )?;

        let candidate_failures = register_int_counter_with_registry!(
            "mev_guard_candidate_failures_total",
            "Total number of candidates skipped because detection failed",
            registry
        )?;

        let rpc_errors = register_int_counter_with_registry!(
            "mev_guard_rpc_errors_total",
            "Total number of upstream provider errors",
            registry
        )?;

        let rpc_latency = register_histogram_vec_with_registry!(
            "mev_guard_rpc_latency_seconds",
            "Upstream provider call latency in seconds",
            &["operation"],
            registry
        )?;

        Ok(Self {
            registry,
            scans,
            dex_candidates,
            sandwiches_detected,
            candidate_failures,
            rpc_errors,
            rpc_latency,
        })
    }

    /// Increment the completed scans counter.
    pub fn inc_scans(&self) {
        self.scans.inc();
    }

    /// Increment the DEX candidate counter.
    pub fn inc_dex_candidates(&self, count: u64) {
        self.dex_candidates.inc_by(count);
    }

    /// Increment the detected sandwich counter.
    pub fn inc_sandwiches_detected(&self, count: u64) {
        self.sandwiches_detected.inc_by(count);
    }

    pub fn inc_candidate_failures(&self) {
        self.candidate_failures.inc();
    }

    /// Increment the RPC errors counter.
    pub fn inc_rpc_errors(&self) {
        self.rpc_errors.inc();
    }

    /// Record RPC latency.
    pub fn observe_rpc_latency(&self, operation: &str, duration_secs: f64) {
        self.rpc_latency.with_label_values(&[operation]).observe(duration_secs);
    }

    /// Get Prometheus metrics as a string.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
