//! HTTP API over the wallet scanner and the single-transaction detector.

use alloy::primitives::TxHash;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use mev_guard_chain::Network;
use mev_guard_heuristics::input::parse_tx_hash;
use mev_guard_heuristics::{ScanError, ScanTarget, TransactionAnalysis, WalletScanner};
use mev_guard_telemetry::audit::write_audit_sample;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub scanner: WalletScanner,
    pub default_network: Network,
    pub audit_output: Option<PathBuf>,
}

/// Error rendered as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        let status = match &err {
            ScanError::Validation(_) => StatusCode::BAD_REQUEST,
            ScanError::Resolution(_) | ScanError::NotFound(_) => StatusCode::NOT_FOUND,
            ScanError::Upstream(_) | ScanError::InconsistentState { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        }
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    limit: Option<String>,
    network: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetworkQuery {
    network: Option<String>,
}

impl AppState {
    fn network(&self, requested: Option<&str>) -> Result<Network, ApiError> {
        match requested.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name
                .parse()
                .map_err(|e: mev_guard_chain::network::UnknownNetwork| {
                    ApiError::bad_request(e.to_string())
                }),
            None => Ok(self.default_network),
        }
    }

    fn audit<T: Serialize>(&self, sample: &T) {
        if let Err(e) = write_audit_sample(self.audit_output.as_ref(), sample) {
            warn!(error = %e, "Failed to write audit sample");
        }
    }
}

/// Non-numeric or zero limits fall back to the default.
fn requested_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
}

pub fn router(state: AppState, allowed_origin: Option<&str>) -> anyhow::Result<Router> {
    let cors = match allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET])
            .allow_headers([header::CONTENT_TYPE]),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    Ok(Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/scan/ens/:name", get(scan_ens))
        .route("/api/scan/:target", get(scan_wallet))
        .route("/api/transaction/:hash", get(analyze_transaction))
        .route("/api/transaction/:hash/context", get(transaction_context))
        .layer(cors)
        .with_state(state))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    match state.scanner.metrics().gather() {
        Ok(body) => Ok((StatusCode::OK, body)),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Dropping this future on client disconnect drops the scan and all of its
/// in-flight upstream calls.
async fn run_scan(
    state: &AppState,
    target: ScanTarget,
    query: &ScanQuery,
) -> Result<Response, ApiError> {
    let network = state.network(query.network.as_deref())?;
    let limit = requested_limit(query.limit.as_deref());
    let report = state
        .scanner
        .scan_target(target, network, limit, &CancellationToken::new())
        .await?;
    state.audit(&report);
    Ok(success(report).into_response())
}

async fn scan_wallet(
    State(state): State<AppState>,
    Path(target): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Result<Response, ApiError> {
    info!(target = %target, limit = ?query.limit, "Scan request");
    let target = ScanTarget::parse(&target)?;
    run_scan(&state, target, &query).await
}

async fn scan_ens(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Result<Response, ApiError> {
    info!(name = %name, "ENS scan request");
    match ScanTarget::parse(&name) {
        Ok(target @ ScanTarget::Ens(_)) => run_scan(&state, target, &query).await,
        _ => Err(ApiError::bad_request(format!("'{}' is not an ENS name", name))),
    }
}

async fn analyze_transaction(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Response, ApiError> {
    let hash = parse_tx_hash(&hash)?;
    let network = state.network(query.network.as_deref())?;

    let analysis = analyze_with_explanation(&state.scanner, network, hash).await?;
    state.audit(&analysis);
    Ok(success(analysis).into_response())
}

/// Detect a sandwich around `hash` and, when one is found, attach the
/// annotator's explanation.
pub async fn analyze_with_explanation(
    scanner: &WalletScanner,
    network: Network,
    hash: TxHash,
) -> Result<TransactionAnalysis, ScanError> {
    let analysis = scanner.detector(network).detect(hash).await?;
    let Some(victim) = analysis.attack.as_ref().map(|a| a.victim_address) else {
        return Ok(analysis);
    };
    let explanation = scanner
        .annotator()
        .explain_attack(&analysis.attack_context(victim))
        .await;
    Ok(analysis.with_explanation(explanation))
}

async fn transaction_context(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> Result<Response, ApiError> {
    let hash = parse_tx_hash(&hash)?;
    let network = state.network(query.network.as_deref())?;
    let context = state.scanner.detector(network).block_context(hash).await?;
    Ok(success(context).into_response())
}
