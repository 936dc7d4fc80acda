//! JSON-RPC client for the Alchemy provider.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use mev_guard_telemetry::Metrics;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::ens;
use crate::error::{ChainError, ChainResult};
use crate::network::Network;
use crate::provider::ChainDataClient;
use crate::retry::retry_async;
use crate::types::{
    format_quantity, ChainTransaction, TransactionReceipt, Transfer, TransferDirection,
};

/// JSON-RPC error codes providers use for throttling.
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

/// Tuning for upstream calls.
#[derive(Debug, Clone)]
pub struct RpcSettings {
    /// Bound on a single call, including reading the body.
    pub timeout: Duration,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: usize,
    pub initial_backoff: Duration,
    /// Cap on transfer records fetched per direction.
    pub max_transfers: usize,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_transfers: 100,
        }
    }
}

/// Alchemy JSON-RPC client bound to one network.
pub struct AlchemyClient {
    client: Client,
    rpc_url: String,
    network: Network,
    settings: RpcSettings,
    metrics: Metrics,
}

impl AlchemyClient {
    /// Create a client for `network` authenticated with `api_key`.
    pub fn new(
        network: Network,
        api_key: &str,
        settings: RpcSettings,
        metrics: Metrics,
    ) -> ChainResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ChainError::Config("provider API key is empty".to_string()));
        }
        Self::with_endpoint(network, &network.provider_url(api_key.trim()), settings, metrics)
    }

    /// Create a client against an explicit JSON-RPC endpoint.
    pub fn with_endpoint(
        network: Network,
        rpc_url: &str,
        settings: RpcSettings,
        metrics: Metrics,
    ) -> ChainResult<Self> {
        let client = Client::builder().build()?;
        info!(network = %network, "Initialized provider client");

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
            network,
            settings,
            metrics,
        })
    }

    async fn call_rpc(&self, method: &str, params: Value) -> ChainResult<Value> {
        let start = Instant::now();
        let result = retry_async(
            |_| self.call_once(method, params.clone()),
            self.settings.max_retries + 1,
            self.settings.initial_backoff,
        )
        .await;
        self.metrics
            .observe_rpc_latency(method, start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            self.metrics.inc_rpc_errors();
            warn!(network = %self.network, method, error = %e, "Provider call failed");
        }
        result
    }

    async fn call_once(&self, method: &str, params: Value) -> ChainResult<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let request = async {
            let response = self.client.post(&self.rpc_url).json(&payload).send().await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ChainError::RateLimited);
            }
            if !status.is_success() {
                return Err(ChainError::Status(status.as_u16()));
            }

            let mut body: Value = response.json().await?;

            if let Some(error) = body.get("error") {
                let code = error["code"].as_i64().unwrap_or_default();
                if RATE_LIMIT_CODES.contains(&code) {
                    return Err(ChainError::RateLimited);
                }
                let message = error["message"].as_str().unwrap_or("unknown error").to_string();
                return Err(ChainError::Rpc { code, message });
            }

            Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
        };

        timeout(self.settings.timeout, request)
            .await
            .map_err(|_| ChainError::Timeout {
                method: method.to_string(),
            })?
    }

    async fn eth_call(&self, to: Address, data: String) -> ChainResult<Option<Address>> {
        let result = self
            .call_rpc(
                "eth_call",
                json!([{ "to": to.to_string(), "data": data }, "latest"]),
            )
            .await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::Decode("eth_call result is not a string".to_string()))?;
        ens::decode_address_word(raw)
    }
}

#[async_trait]
impl ChainDataClient for AlchemyClient {
    fn network(&self) -> Network {
        self.network
    }

    async fn resolve_ens(&self, name: &str) -> ChainResult<Option<Address>> {
        let name = ens::normalize(name);
        let node = ens::namehash(&name);

        let resolver = self
            .eth_call(
                ens::ENS_REGISTRY,
                ens::encode_node_call(ens::RESOLVER_SELECTOR, node),
            )
            .await?;
        let Some(resolver) = resolver else {
            debug!(name = %name, "ENS name has no resolver");
            return Ok(None);
        };

        let resolved = self
            .eth_call(resolver, ens::encode_node_call(ens::ADDR_SELECTOR, node))
            .await?;
        match resolved {
            Some(address) => info!(name = %name, address = %address, "Resolved ENS name"),
            None => debug!(name = %name, "ENS name has no address record"),
        }
        Ok(resolved)
    }

    async fn get_transfers(
        &self,
        address: Address,
        direction: TransferDirection,
    ) -> ChainResult<Vec<Transfer>> {
        let side = match direction {
            TransferDirection::Outgoing => "fromAddress",
            TransferDirection::Incoming => "toAddress",
        };
        let params = json!([{
            side: address.to_string(),
            "category": ["external", "erc20"],
            "maxCount": format_quantity(self.settings.max_transfers as u64),
            "order": "desc",
            "withMetadata": false
        }]);

        let mut result = self.call_rpc("alchemy_getAssetTransfers", params).await?;
        let transfers: Vec<Transfer> = match result.get_mut("transfers") {
            Some(list) => serde_json::from_value(list.take())?,
            None => {
                return Err(ChainError::Decode(
                    "asset transfer response has no transfers list".to_string(),
                ))
            }
        };

        debug!(address = %address, ?direction, count = transfers.len(), "Fetched transfers");
        Ok(transfers)
    }

    async fn get_transaction(&self, hash: TxHash) -> ChainResult<Option<ChainTransaction>> {
        let result = self
            .call_rpc("eth_getTransactionByHash", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn get_receipt(&self, hash: TxHash) -> ChainResult<Option<TransactionReceipt>> {
        let result = self
            .call_rpc("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(result)?))
    }

    async fn get_block_transactions(
        &self,
        block_number: u64,
    ) -> ChainResult<Option<Vec<ChainTransaction>>> {
        let mut result = self
            .call_rpc(
                "eth_getBlockByNumber",
                json!([format_quantity(block_number), true]),
            )
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let transactions = match result.get_mut("transactions") {
            Some(Value::Array(list)) => std::mem::take(list),
            _ => {
                return Err(ChainError::Decode(format!(
                    "block {} has no transactions array",
                    block_number
                )))
            }
        };

        let transactions = transactions
            .into_iter()
            .map(serde_json::from_value::<ChainTransaction>)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(block_number, count = transactions.len(), "Fetched block transactions");
        Ok(Some(transactions))
    }
}
