//! LLM-backed pairwise contradiction classification.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use deponent_core::{Claim, PairLabel};

use crate::llm::{extract_json_object, ChatClient, ChatMessage};
use crate::{PairClassifier, PairJudgment};

/// Used when the model omits a confidence.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

const SYSTEM_PROMPT: &str = "You compare two statements made by the same deposition witness. \
Decide whether they are consistent. Respond with a JSON object only: \
{\"label\": one of CONSISTENT, HARD_CONTRADICTION, SOFT_INCONSISTENCY, SCOPE_SHIFT, \
TEMPORAL_CONFLICT, DEFINITION_DRIFT, \"explanation\": one or two sentences, \
\"confidence\": number between 0 and 1}. \
HARD_CONTRADICTION: both cannot be true. SOFT_INCONSISTENCY: tension without strict conflict. \
SCOPE_SHIFT: a claim was narrowed or widened. TEMPORAL_CONFLICT: incompatible dates, times or \
sequence. DEFINITION_DRIFT: the same term is used with a shifting meaning.";

/// Pair classifier over any [`ChatClient`].
pub struct LlmPairClassifier {
    client: Arc<dyn ChatClient>,
}

impl LlmPairClassifier {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PairClassifier for LlmPairClassifier {
    async fn classify_pair(&self, claim_a: &Claim, claim_b: &Claim) -> Result<PairJudgment> {
        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(claim_a, claim_b)),
        ];
        let output = self
            .client
            .complete(messages)
            .await
            .with_context(|| format!("classification failed for {} / {}", claim_a.id, claim_b.id))?;
        parse_pair_judgment(&output)
    }
}

fn build_prompt(a: &Claim, b: &Claim) -> String {
    format!(
        "Statement A ({}): {}\nStatement B ({}): {}",
        a.citation, a.normalized_text, b.citation, b.normalized_text
    )
}

#[derive(Debug, Deserialize)]
struct LlmJudgment {
    #[serde(alias = "type", alias = "classification")]
    label: String,
    #[serde(default, alias = "reason", alias = "reasoning")]
    explanation: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Parse the model's verdict. An unknown label is malformed output.
pub fn parse_pair_judgment(output: &str) -> Result<PairJudgment> {
    let json = extract_json_object(output)
        .ok_or_else(|| anyhow::anyhow!("no JSON object in classifier output"))?;
    let raw: LlmJudgment = serde_json::from_str(json).context("malformed classifier output")?;
    let label = PairLabel::parse_label(&raw.label)
        .ok_or_else(|| anyhow::anyhow!("unknown classifier label '{}'", raw.label))?;
    let confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);
    Ok(PairJudgment {
        label,
        explanation: raw.explanation.trim().to_string(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deponent_core::{CitationAnchor, Role, Utterance};

    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatClient for FixedChat {
        async fn complete(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn claim(id: &str, utterance: &str, text: &str) -> Claim {
        let u = Utterance {
            id: utterance.into(),
            document_id: "depo".into(),
            page_number: 1,
            line_start: Some(2),
            line_end: Some(2),
            role: Role::Answer,
            speaker: "WITNESS".into(),
            text: text.into(),
            citation: CitationAnchor::line(1, 2),
        };
        Claim::from_utterance(id, &u, text)
    }

    #[test]
    fn test_parse_judgment() {
        let j = parse_pair_judgment(
            r#"{"label": "hard contradiction", "explanation": " Present vs absent. ", "confidence": 0.9}"#,
        )
        .unwrap();
        assert_eq!(j.label, PairLabel::HardContradiction);
        assert_eq!(j.explanation, "Present vs absent.");
        assert!((j.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_clamped_and_defaulted() {
        let j = parse_pair_judgment(r#"{"label": "SCOPE_SHIFT", "confidence": 1.7}"#).unwrap();
        assert_eq!(j.confidence, 1.0);
        let j = parse_pair_judgment(r#"{"label": "CONSISTENT"}"#).unwrap();
        assert_eq!(j.confidence, DEFAULT_CONFIDENCE);
        assert!(j.explanation.is_empty());
    }

    #[test]
    fn test_unknown_label_is_error() {
        let err = parse_pair_judgment(r#"{"label": "CONTRADICTORY"}"#).unwrap_err();
        assert!(err.to_string().contains("CONTRADICTORY"));
        assert!(parse_pair_judgment("no verdict").is_err());
    }

    #[tokio::test]
    async fn test_classifier_over_chat() {
        let classifier = LlmPairClassifier::new(Arc::new(FixedChat(
            "Verdict:\n{\"label\": \"TEMPORAL_CONFLICT\", \"explanation\": \"3pm\", \"confidence\": 0.6}",
        )));
        let j = classifier
            .classify_pair(
                &claim("c1", "u2", "I was present"),
                &claim("c2", "u4", "I was not present at 3pm"),
            )
            .await
            .unwrap();
        assert_eq!(j.label, PairLabel::TemporalConflict);
        assert_eq!(j.label.contradiction_type().map(|t| t.as_str()), Some("TEMPORAL_CONFLICT"));
    }
}
