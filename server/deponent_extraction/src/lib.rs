//! # Deponent Extraction
//!
//! The asynchronous half of deposition analysis.
//!
//! This crate provides:
//! - **Capability traits** for the external model calls: [`ClaimExtractor`],
//!   [`EmbeddingProvider`] and [`PairClassifier`]
//! - **Contradiction orchestration** over a claim set: [`orchestrator::ContradictionOrchestrator`]
//! - **End-to-end analysis** from raw transcript text to report: [`pipeline::AnalysisPipeline`]
//! - **OpenAI-compatible adapters**: [`llm::OpenAiChatClient`],
//!   [`claims::LlmClaimExtractor`], [`classifier::LlmPairClassifier`],
//!   [`embeddings::OpenAiEmbeddingProvider`]
//!
//! # Test Infrastructure
//!
//! All tests run against hand-written mock capabilities; no network access is
//! needed. Prompt wording is not part of any contract and is not asserted.

pub mod claims;
pub mod classifier;
pub mod embeddings;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use deponent_core::{Claim, ClaimId, Modality, PairLabel, Polarity, Utterance};

pub use orchestrator::{ContradictionOrchestrator, OrchestrationResult, OrchestratorConfig};
pub use pipeline::{AnalysisOutcome, AnalysisPipeline};
pub use progress::{AnalysisPhase, AnalysisProgress, CancellationFlag, ProgressSink};

/// Claim content returned by a [`ClaimExtractor`].
///
/// Provenance (id, utterance, document, citation) is assigned by the caller
/// from the source utterance, never by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaim {
    pub normalized_text: String,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub modality: Modality,
    #[serde(default)]
    pub time_scope: Option<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl ExtractedClaim {
    pub fn new(normalized_text: impl Into<String>) -> Self {
        Self {
            normalized_text: normalized_text.into(),
            ..Self::default()
        }
    }

    /// Attach provenance from `utterance` and produce a [`Claim`].
    pub fn into_claim(self, id: impl Into<ClaimId>, utterance: &Utterance) -> Claim {
        let mut claim = Claim::from_utterance(id, utterance, self.normalized_text);
        claim.polarity = self.polarity;
        claim.modality = self.modality;
        claim.time_scope = self.time_scope.filter(|s| !s.trim().is_empty());
        claim.entities = self
            .entities
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        claim.topics = self
            .topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        claim
    }
}

/// Splits an ANSWER utterance into atomic claims.
#[async_trait]
pub trait ClaimExtractor: Send + Sync {
    /// Extract zero or more claims. An error skips the utterance.
    async fn extract_claims(&self, utterance: &Utterance) -> anyhow::Result<Vec<ExtractedClaim>>;
}

/// Produces embedding vectors for claim text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Generate embeddings for a batch of texts, one vector per input in order.
    ///
    /// Default implementation calls `embed` per text.
    async fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Verdict of a [`PairClassifier`] on one claim pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairJudgment {
    pub label: PairLabel,
    pub explanation: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

/// Judges whether two claims contradict each other.
#[async_trait]
pub trait PairClassifier: Send + Sync {
    async fn classify_pair(&self, claim_a: &Claim, claim_b: &Claim) -> anyhow::Result<PairJudgment>;
}
