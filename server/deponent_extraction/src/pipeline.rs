//! End-to-end deposition analysis.
//!
//! [`AnalysisPipeline::analyze`] runs, in order:
//!
//! 1. segmentation of the raw transcript (fatal on input errors)
//! 2. claim extraction for every ANSWER utterance (failures skip the utterance)
//! 3. claim embedding, when an embedder is configured (failure drops the
//!    semantic signal)
//! 4. contradiction orchestration
//! 5. report aggregation
//!
//! The caller receives either an [`AnalysisOutcome`] or exactly one terminal
//! [`AnalysisError`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, info_span, warn, Instrument};

use deponent_config::{AnalysisConfig, DeponentConfig};
use deponent_core::{
    AnalysisError, AnalysisStatistics, CandidateConfig, Claim, DocumentInfo, EmbeddingIndex,
    Report, TranscriptSegmenter, Utterance,
};

use crate::claims::LlmClaimExtractor;
use crate::classifier::LlmPairClassifier;
use crate::embeddings::OpenAiEmbeddingProvider;
use crate::llm::{ChatClient, OpenAiChatClient};
use crate::orchestrator::{ContradictionOrchestrator, OrchestratorConfig};
use crate::progress::{emit, AnalysisPhase, AnalysisProgress, CancellationFlag, ProgressSink};
use crate::{ClaimExtractor, EmbeddingProvider, PairClassifier};

impl From<&AnalysisConfig> for OrchestratorConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            candidates: CandidateConfig {
                top_k: config.top_k,
                similarity_threshold: config.similarity_threshold,
                entity_score: config.entity_score,
                topic_score: config.topic_score,
                temporal_score: config.temporal_score,
            },
            classify_delay: Duration::from_millis(config.classify_delay_ms),
        }
    }
}

/// Everything produced by one successful analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: Report,
    pub statistics: AnalysisStatistics,
    pub utterances: Vec<Utterance>,
    pub claims: Vec<Claim>,
    /// Answer utterances skipped because extraction failed.
    pub extraction_failures: usize,
}

pub struct AnalysisPipeline {
    segmenter: TranscriptSegmenter,
    extractor: Arc<dyn ClaimExtractor>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    orchestrator: ContradictionOrchestrator,
}

impl AnalysisPipeline {
    pub fn new(
        extractor: Arc<dyn ClaimExtractor>,
        classifier: Arc<dyn PairClassifier>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            segmenter: TranscriptSegmenter::new(),
            extractor,
            embedder: None,
            orchestrator: ContradictionOrchestrator::new(classifier, config),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_segmenter(mut self, segmenter: TranscriptSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Build a pipeline backed by the OpenAI-compatible adapters.
    ///
    /// One chat client is shared by extraction and classification. The
    /// embedder is attached only when `[embeddings] enabled = true`.
    pub fn from_config(config: &DeponentConfig) -> anyhow::Result<Self> {
        let chat: Arc<dyn ChatClient> = Arc::new(
            OpenAiChatClient::from_config(&config.llm).context("Failed to build chat client")?,
        );
        let mut pipeline = Self::new(
            Arc::new(LlmClaimExtractor::new(chat.clone())),
            Arc::new(LlmPairClassifier::new(chat)),
            OrchestratorConfig::from(&config.analysis),
        );
        if config.embeddings.enabled {
            let embedder = OpenAiEmbeddingProvider::from_config(&config.embeddings)
                .context("Failed to build embedding provider")?;
            pipeline = pipeline.with_embedder(Arc::new(embedder));
        }
        Ok(pipeline)
    }

    /// Analyze one transcript.
    pub async fn analyze(
        &self,
        document: DocumentInfo,
        raw: &str,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationFlag>,
    ) -> deponent_core::Result<AnalysisOutcome> {
        let span = info_span!(
            "deponent.analyze",
            document = %document.id,
            text_length = raw.len(),
        );
        self.analyze_inner(document, raw, progress, cancel)
            .instrument(span)
            .await
    }

    async fn analyze_inner(
        &self,
        mut document: DocumentInfo,
        raw: &str,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationFlag>,
    ) -> deponent_core::Result<AnalysisOutcome> {
        // ── Step 1: Segmentation ───────────────────────────────────────
        emit(progress, AnalysisProgress::PhaseStarted { phase: AnalysisPhase::Segmenting });
        let segmentation = {
            let _guard = info_span!("deponent.segment").entered();
            self.segmenter.segment(&document.id, raw)?
        };
        info!(
            utterances = segmentation.utterances.len(),
            answers = segmentation.answer_count(),
            dropped_lines = segmentation.dropped_lines,
            "Transcript segmented"
        );
        if document.deponent.is_none() {
            document.deponent = segmentation.metadata.deponent.clone();
        }
        if document.case_caption.is_none() {
            document.case_caption = segmentation.metadata.case_caption.clone();
        }

        // ── Step 2: Claim extraction ───────────────────────────────────
        emit(
            progress,
            AnalysisProgress::PhaseStarted { phase: AnalysisPhase::ExtractingClaims },
        );
        let answers: Vec<&Utterance> = segmentation.answers().collect();
        let (claims, extraction_failures) = self
            .extract_all(&answers, progress)
            .instrument(info_span!("deponent.extract", answers = answers.len()))
            .await;
        if claims.is_empty() {
            return Err(AnalysisError::NoClaims {
                answers: answers.len(),
                failed: extraction_failures,
            });
        }

        // ── Step 3: Embedding ──────────────────────────────────────────
        let embeddings = match &self.embedder {
            Some(embedder) => {
                emit(progress, AnalysisProgress::PhaseStarted { phase: AnalysisPhase::Embedding });
                embed_claims(embedder.as_ref(), &claims)
                    .instrument(info_span!("deponent.embed", claims = claims.len()))
                    .await
            }
            None => None,
        };

        // ── Step 4: Contradiction orchestration ────────────────────────
        emit(progress, AnalysisProgress::PhaseStarted { phase: AnalysisPhase::Classifying });
        let result = self
            .orchestrator
            .run(&claims, embeddings.as_ref(), progress, cancel)
            .await?;

        // ── Step 5: Report ─────────────────────────────────────────────
        emit(progress, AnalysisProgress::PhaseStarted { phase: AnalysisPhase::Reporting });
        let report = Report::build(document, &claims, &result.contradictions);
        emit(
            progress,
            AnalysisProgress::Completed {
                total_claims: claims.len(),
                total_contradictions: result.contradictions.len(),
            },
        );

        Ok(AnalysisOutcome {
            report,
            statistics: result.statistics,
            utterances: segmentation.utterances,
            claims,
            extraction_failures,
        })
    }

    /// Extract claims from `answers` in order. Returns the claims and the
    /// number of answers whose extraction failed.
    async fn extract_all(
        &self,
        answers: &[&Utterance],
        progress: Option<&dyn ProgressSink>,
    ) -> (Vec<Claim>, usize) {
        let mut claims = Vec::new();
        let mut failed = 0;

        for (i, answer) in answers.iter().enumerate() {
            let extracted = match self.extractor.extract_claims(answer).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    warn!("Claim extraction failed for {}: {:#}", answer.id, e);
                    failed += 1;
                    emit(
                        progress,
                        AnalysisProgress::UtteranceExtracted {
                            processed: i + 1,
                            total: answers.len(),
                            claims: 0,
                            failed: true,
                        },
                    );
                    continue;
                }
            };

            let before = claims.len();
            claims.extend(
                extracted
                    .into_iter()
                    .filter(|c| !c.normalized_text.trim().is_empty())
                    .enumerate()
                    .map(|(n, c)| c.into_claim(format!("{}-c{}", answer.id, n + 1), answer)),
            );
            debug!(utterance = %answer.id, claims = claims.len() - before, "Answer processed");
            emit(
                progress,
                AnalysisProgress::UtteranceExtracted {
                    processed: i + 1,
                    total: answers.len(),
                    claims: claims.len() - before,
                    failed: false,
                },
            );
        }

        info!(claims = claims.len(), failed, "Claim extraction complete");
        (claims, failed)
    }
}

/// Embed every claim's text. Any failure yields `None` so candidate
/// generation runs without the semantic signal.
async fn embed_claims(embedder: &dyn EmbeddingProvider, claims: &[Claim]) -> Option<EmbeddingIndex> {
    let texts: Vec<&str> = claims.iter().map(|c| c.normalized_text.as_str()).collect();
    match embedder.embed_batch(&texts).await {
        Ok(vectors) if vectors.len() == claims.len() => {
            let index = EmbeddingIndex::from_pairs(
                claims.iter().map(|c| c.id.clone()).zip(vectors),
            );
            debug!(vectors = index.len(), dimension = ?index.dimension(), "Claims embedded");
            Some(index)
        }
        Ok(vectors) => {
            warn!(
                "Embedding returned {} vectors for {} claims; continuing without semantic candidates",
                vectors.len(),
                claims.len()
            );
            None
        }
        Err(e) => {
            warn!("Embedding failed; continuing without semantic candidates: {:#}", e);
            None
        }
    }
}
