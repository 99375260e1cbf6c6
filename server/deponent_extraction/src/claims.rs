//! LLM-backed claim extraction.
//!
//! [`LlmClaimExtractor`] asks a chat model to split one answer into atomic
//! claims and parses the JSON array it returns. Parsing tolerates prose and
//! markdown fences around the array; anything else is an error so the
//! pipeline can skip the utterance.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use deponent_core::{Modality, Polarity, Utterance};

use crate::llm::{extract_json_array, ChatClient, ChatMessage};
use crate::{ClaimExtractor, ExtractedClaim};

const SYSTEM_PROMPT: &str = "You analyze deposition testimony. Split the witness's answer into \
atomic factual claims. Respond with a JSON array only. Each element has: \
\"text\" (the claim restated as a standalone sentence), \
\"polarity\" (\"affirm\", \"deny\" or \"unknown\"), \
\"modality\" (\"certain\", \"uncertain\" or \"dont_recall\"), \
\"time_scope\" (string or null), \"entities\" (array of strings), \
\"topics\" (array of short lowercase strings). \
Return [] if the answer asserts nothing.";

/// Claim extractor over any [`ChatClient`].
pub struct LlmClaimExtractor {
    client: Arc<dyn ChatClient>,
}

impl LlmClaimExtractor {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClaimExtractor for LlmClaimExtractor {
    async fn extract_claims(&self, utterance: &Utterance) -> Result<Vec<ExtractedClaim>> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(utterance)),
        ];
        let output = self
            .client
            .complete(messages)
            .await
            .with_context(|| format!("claim extraction failed for {}", utterance.id))?;
        let claims = parse_llm_claims(&output)?;
        debug!(utterance = %utterance.id, claims = claims.len(), "Claims extracted");
        Ok(claims)
    }
}

fn build_prompt(utterance: &Utterance) -> String {
    format!(
        "Speaker: {}\nCitation: {}\nAnswer:\n{}",
        utterance.speaker, utterance.citation, utterance.text
    )
}

#[derive(Debug, Deserialize)]
struct LlmClaim {
    #[serde(default, alias = "normalized_text", alias = "claim")]
    text: Option<String>,
    #[serde(default)]
    polarity: Option<String>,
    #[serde(default)]
    modality: Option<String>,
    #[serde(default)]
    time_scope: Option<String>,
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
}

/// Parse the model's claim array.
///
/// Entries without text are skipped. Unrecognized polarity or modality
/// values fall back to `unknown` and `certain`.
pub fn parse_llm_claims(output: &str) -> Result<Vec<ExtractedClaim>> {
    let json = extract_json_array(output)
        .ok_or_else(|| anyhow::anyhow!("no JSON array in claim extraction output"))?;
    let raw: Vec<LlmClaim> =
        serde_json::from_str(json).context("malformed claim extraction output")?;

    Ok(raw
        .into_iter()
        .filter_map(|c| {
            let text = c.text?.trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(ExtractedClaim {
                normalized_text: text,
                polarity: c.polarity.as_deref().map(parse_polarity).unwrap_or_default(),
                modality: c.modality.as_deref().map(parse_modality).unwrap_or_default(),
                time_scope: c.time_scope,
                entities: c.entities,
                topics: c.topics.into_iter().map(|t| t.to_lowercase()).collect(),
            })
        })
        .collect())
}

fn parse_polarity(s: &str) -> Polarity {
    match s.trim().to_ascii_lowercase().as_str() {
        "affirm" | "affirmative" | "positive" | "yes" => Polarity::Affirm,
        "deny" | "denial" | "negative" | "no" => Polarity::Deny,
        _ => Polarity::Unknown,
    }
}

fn parse_modality(s: &str) -> Modality {
    let normalized: String = s
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect();
    match normalized.as_str() {
        "uncertain" | "hedged" | "unsure" => Modality::Uncertain,
        "dontrecall" | "donotrecall" | "dontremember" | "norecall" => Modality::DontRecall,
        _ => Modality::Certain,
    }
}
