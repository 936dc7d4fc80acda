//! Prompt construction, response parsing and deterministic fallbacks.

use crate::error::{AnnotatorError, AnnotatorResult};
use crate::{AttackContext, AttackExplanation, ScanSummary};
use serde::Deserialize;

const DEFAULT_RECOMMENDATIONS: [&str; 4] = [
    "Submit swaps through an MEV-protected RPC endpoint such as MEV Blocker or Flashbots Protect",
    "Set a tight slippage tolerance so sandwiched swaps revert instead of filling at a worse price",
    "Split large swaps into smaller orders to reduce price impact",
    "Prefer aggregators or intent-based venues that settle orders off the public mempool",
];

pub fn scan_report_prompt(summary: &ScanSummary) -> String {
    format!(
        "Generate a brief MEV exposure report for this wallet:\n\
         - Address: {}\n\
         - Total swap transactions: {}\n\
         - Transactions affected by sandwich attacks: {}\n\
         - Estimated total loss: ${} (placeholder, not priced)\n\
         - Risk level: {}\n\n\
         Write 2-3 sentences summarizing the findings and risk level.",
        summary.wallet_address,
        summary.total_transactions,
        summary.attacked_transactions,
        summary.total_loss_usd,
        summary.risk_level,
    )
}

pub fn attack_prompt(context: &AttackContext) -> String {
    let mut details = format!(
        "- Victim Transaction: {}\n- Block Number: {}\n- Victim Address: {}\n",
        context.victim_tx_hash, context.block_number, context.victim_address
    );
    if let Some(hash) = &context.frontrun_hash {
        details.push_str(&format!("- Frontrun Transaction: {}\n", hash));
    }
    if let Some(hash) = &context.backrun_hash {
        details.push_str(&format!("- Backrun Transaction: {}\n", hash));
    }
    if let Some(attacker) = &context.attacker_address {
        details.push_str(&format!("- Attacker Address: {}\n", attacker));
    }

    format!(
        "You are an MEV (Maximal Extractable Value) expert. Analyze this potential sandwich \
         attack and explain it simply.\n\nTransaction Details:\n{}\n\
         Respond in JSON format:\n\
         {{\n  \"explanation\": \"2-3 sentence explanation of what happened in plain English\",\n  \
         \"recommendations\": [\"3-4 actionable tips to avoid this in the future\"]\n}}",
        details
    )
}

#[derive(Deserialize)]
struct RawExplanation {
    explanation: String,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// Parse a model reply into an explanation.
///
/// JSON replies (optionally inside a code fence) are used as-is. Plain prose
/// becomes the explanation with the default recommendations.
pub fn parse_explanation(text: &str) -> AnnotatorResult<AttackExplanation> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(AnnotatorError::MalformedResponse("empty explanation".to_string()));
    }

    match serde_json::from_str::<RawExplanation>(trimmed) {
        Ok(raw) if !raw.explanation.trim().is_empty() => Ok(AttackExplanation {
            explanation: raw.explanation.trim().to_string(),
            recommendations: if raw.recommendations.is_empty() {
                default_recommendations()
            } else {
                raw.recommendations
            },
        }),
        Ok(_) => Err(AnnotatorError::MalformedResponse("blank explanation field".to_string())),
        Err(_) => Ok(AttackExplanation {
            explanation: trimmed.to_string(),
            recommendations: default_recommendations(),
        }),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn default_recommendations() -> Vec<String> {
    DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
}

/// Templated scan summary built only from the counts.
pub fn fallback_summary(summary: &ScanSummary) -> String {
    if summary.total_transactions == 0 {
        return format!(
            "No DEX swap transactions were found for {}, so there is no sandwich attack exposure to report.",
            summary.wallet_address
        );
    }

    let rate = summary.attacked_transactions as f64 * 100.0 / summary.total_transactions as f64;
    let mut text = format!(
        "Scanned {} DEX swap transactions for {}: {} matched a sandwich attack pattern ({:.1}% attack rate). Risk level: {}.",
        summary.total_transactions,
        summary.wallet_address,
        summary.attacked_transactions,
        rate,
        summary.risk_level,
    );
    if summary.attacked_transactions > 0 {
        text.push_str(
            " Consider routing swaps through an MEV-protected RPC and tightening slippage limits.",
        );
    }
    text
}

/// Templated explanation built from the detector's findings.
pub fn fallback_explanation(context: &AttackContext) -> AttackExplanation {
    let explanation = match (
        &context.attacker_address,
        &context.frontrun_hash,
        &context.backrun_hash,
    ) {
        (Some(attacker), Some(frontrun), Some(backrun)) => format!(
            "Transaction {} in block {} was sandwiched: {} swapped immediately before it ({}) and \
             immediately after it ({}) in the same block, profiting from the price movement the swap caused.",
            context.victim_tx_hash, context.block_number, attacker, frontrun, backrun
        ),
        _ => format!(
            "No sandwich pattern was found around transaction {} in block {}.",
            context.victim_tx_hash, context.block_number
        ),
    };

    AttackExplanation {
        explanation,
        recommendations: default_recommendations(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: usize, attacked: usize, risk: &str) -> ScanSummary {
        ScanSummary {
            wallet_address: "0xabc".to_string(),
            total_transactions: total,
            attacked_transactions: attacked,
            total_loss_usd: "0".to_string(),
            risk_level: risk.to_string(),
        }
    }

    #[test]
    fn fallback_summary_is_deterministic() {
        let s = summary(20, 3, "high");
        assert_eq!(fallback_summary(&s), fallback_summary(&s));
        assert!(fallback_summary(&s).contains("15.0% attack rate"));
        assert!(fallback_summary(&s).contains("Risk level: high."));
    }

    #[test]
    fn fallback_summary_handles_empty_scans() {
        let text = fallback_summary(&summary(0, 0, "low"));
        assert!(text.starts_with("No DEX swap transactions were found for 0xabc"));
    }

    #[test]
    fn parses_fenced_json() {
        let parsed = parse_explanation(
            "```json\n{\"explanation\": \"Sandwiched.\", \"recommendations\": [\"a\", \"b\"]}\n```",
        )
        .unwrap();
        assert_eq!(parsed.explanation, "Sandwiched.");
        assert_eq!(parsed.recommendations.len(), 2);
    }

    #[test]
    fn prose_becomes_explanation() {
        let parsed = parse_explanation("The bot bought first and sold after.").unwrap();
        assert_eq!(parsed.explanation, "The bot bought first and sold after.");
        assert_eq!(parsed.recommendations, default_recommendations());
    }

    #[test]
    fn empty_reply_is_malformed() {
        assert!(parse_explanation("   ").is_err());
        assert!(parse_explanation(r#"{"explanation": " "}"#).is_err());
    }

    #[test]
    fn attack_prompt_omits_unknown_parties() {
        let context = AttackContext {
            victim_tx_hash: "0xv".to_string(),
            block_number: 7,
            victim_address: "0xu".to_string(),
            frontrun_hash: None,
            backrun_hash: None,
            attacker_address: None,
        };
        let prompt = attack_prompt(&context);
        assert!(prompt.contains("- Block Number: 7"));
        assert!(!prompt.contains("Attacker Address"));
        assert!(fallback_explanation(&context).explanation.starts_with("No sandwich pattern"));
    }
}
