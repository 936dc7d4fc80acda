//! Best-effort narrative annotation for scan reports and detected attacks.
//!
//! A [`ReportAnnotator`] is chosen once at startup: `Enabled` when a
//! credential is configured, `Disabled` otherwise. Callers always receive
//! text. When the narrative service is disabled, slow, or returns something
//! unusable, the deterministic fallbacks in [`prompts`] are used instead.

pub mod client;
pub mod error;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use client::AnthropicClient;
pub use error::{AnnotatorError, AnnotatorResult};

/// Counts describing a finished wallet scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub wallet_address: String,
    pub total_transactions: usize,
    pub attacked_transactions: usize,
    pub total_loss_usd: String,
    pub risk_level: String,
}

/// What is known about a single analysed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackContext {
    pub victim_tx_hash: String,
    pub block_number: u64,
    pub victim_address: String,
    pub frontrun_hash: Option<String>,
    pub backrun_hash: Option<String>,
    pub attacker_address: Option<String>,
}

/// Plain-language explanation of an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackExplanation {
    pub explanation: String,
    pub recommendations: Vec<String>,
}

/// A text-completion service.
///
/// Allows the hosted client to be swapped for another provider, or for a
/// stub in tests, without touching [`ReportAnnotator`].
#[async_trait]
pub trait NarrativeBackend: Send + Sync {
    /// Complete `prompt` and return the generated text.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> AnnotatorResult<String>;
}

/// Settings used to construct the annotator at startup.
#[derive(Debug, Clone)]
pub struct AnnotatorSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AnnotatorSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: client::DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Narrative annotator, selected once at process start.
#[derive(Clone)]
pub enum ReportAnnotator {
    Enabled(Arc<dyn NarrativeBackend>),
    Disabled,
}

impl ReportAnnotator {
    /// `Enabled` with the hosted client when a non-empty API key is set,
    /// otherwise `Disabled`.
    pub fn from_settings(settings: AnnotatorSettings) -> Self {
        match settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                match AnthropicClient::new(key, &settings.model, settings.timeout) {
                    Ok(client) => ReportAnnotator::Enabled(Arc::new(client)),
                    Err(e) => {
                        warn!(error = %e, "Narrative client unavailable, using templated summaries");
                        ReportAnnotator::Disabled
                    }
                }
            }
            _ => ReportAnnotator::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ReportAnnotator::Enabled(_))
    }

    /// Ask the backend for a scan summary.
    pub async fn try_summarize(&self, summary: &ScanSummary) -> AnnotatorResult<String> {
        let ReportAnnotator::Enabled(backend) = self else {
            return Err(AnnotatorError::MissingCredential);
        };
        let text = backend.complete(&prompts::scan_report_prompt(summary), 200).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AnnotatorError::MalformedResponse("empty summary".to_string()));
        }
        Ok(text.to_string())
    }

    /// Summary text for a scan; never fails.
    pub async fn summarize(&self, summary: &ScanSummary) -> String {
        match self.try_summarize(summary).await {
            Ok(text) => text,
            Err(e) => {
                log_fallback("scan summary", &e);
                prompts::fallback_summary(summary)
            }
        }
    }

    /// Ask the backend to explain an analysed transaction.
    pub async fn try_explain_attack(
        &self,
        context: &AttackContext,
    ) -> AnnotatorResult<AttackExplanation> {
        let ReportAnnotator::Enabled(backend) = self else {
            return Err(AnnotatorError::MissingCredential);
        };
        let text = backend.complete(&prompts::attack_prompt(context), 500).await?;
        prompts::parse_explanation(&text)
    }

    /// Explanation for an analysed transaction; never fails.
    pub async fn explain_attack(&self, context: &AttackContext) -> AttackExplanation {
        match self.try_explain_attack(context).await {
            Ok(explanation) => explanation,
            Err(e) => {
                log_fallback("attack explanation", &e);
                prompts::fallback_explanation(context)
            }
        }
    }
}

fn log_fallback(what: &str, error: &AnnotatorError) {
    if matches!(error, AnnotatorError::MissingCredential) {
        debug!("Narrative annotator disabled, using templated {}", what);
    } else {
        warn!(error = %error, "Narrative {} failed, using templated text", what);
    }
}
