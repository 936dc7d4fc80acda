//! Hosted messages API client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{AnnotatorError, AnnotatorResult};
use crate::NarrativeBackend;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic messages API.
pub struct AnthropicClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> AnnotatorResult<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, model, timeout)
    }

    pub fn with_endpoint(
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> AnnotatorResult<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl NarrativeBackend for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> AnnotatorResult<String> {
        let payload = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{"role": "user", "content": prompt}]
        });

        let request = async {
            let response = self
                .client
                .post(&self.endpoint)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&payload)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(AnnotatorError::Status(response.status().as_u16()));
            }

            let body: Value = response.json().await?;
            first_text_block(&body)
        };

        timeout(self.timeout, request)
            .await
            .map_err(|_| AnnotatorError::Timeout)?
    }
}

fn first_text_block(body: &Value) -> AnnotatorResult<String> {
    body["content"]
        .as_array()
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|block| block["type"] == "text")
                .and_then(|block| block["text"].as_str())
        })
        .map(str::to_string)
        .ok_or_else(|| AnnotatorError::MalformedResponse("no text content block".to_string()))
}
