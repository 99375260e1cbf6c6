//! Contradiction orchestration over one claim set.
//!
//! For each claim in document order the orchestrator asks the
//! [`CandidateGenerator`] for ranked candidates and sends every new pair to
//! the [`PairClassifier`], one call at a time.
//!
//! # Per-run guarantees
//!
//! - Each unordered pair reaches the classifier at most once. The pair key is
//!   recorded *before* the call, so a failed call is not retried by the
//!   reverse pair later in the run.
//! - Self pairs and same-utterance pairs are dropped before the call.
//! - A failing call is logged and counted; the run continues.
//! - Cancellation is observed between claims, never inside a pair.
//!
//! The seen set and the contradiction list live in a [`RunState`] created per
//! call to [`ContradictionOrchestrator::run`], so concurrent runs never share
//! state.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use deponent_core::{
    check_pair, contradiction_id, pair_key, AnalysisError, AnalysisStatistics, CandidateConfig,
    CandidateGenerator, CandidatePair, Claim, Contradiction, EmbeddingIndex, PairKey,
};

use crate::progress::{emit, AnalysisProgress, CancellationFlag, ProgressSink};
use crate::PairClassifier;

/// Default pause between successive classifier calls.
pub const DEFAULT_CLASSIFY_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    pub candidates: CandidateConfig,
    /// Pause between successive classifier calls. Not applied before the first.
    pub classify_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateConfig::default(),
            classify_delay: DEFAULT_CLASSIFY_DELAY,
        }
    }
}

/// Output of one orchestrator run.
#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub contradictions: Vec<Contradiction>,
    pub statistics: AnalysisStatistics,
}

pub struct ContradictionOrchestrator {
    classifier: Arc<dyn PairClassifier>,
    generator: CandidateGenerator,
    classify_delay: Duration,
}

/// Mutable state of a single run.
#[derive(Debug, Default)]
struct RunState {
    seen: HashSet<PairKey>,
    contradictions: Vec<Contradiction>,
    pairs_analyzed: usize,
    pairs_failed: usize,
    pairs_skipped: usize,
    calls_made: usize,
}

impl ContradictionOrchestrator {
    pub fn new(classifier: Arc<dyn PairClassifier>, config: OrchestratorConfig) -> Self {
        Self {
            classifier,
            generator: CandidateGenerator::new(config.candidates),
            classify_delay: config.classify_delay,
        }
    }

    /// Classify candidate pairs across `claims`.
    ///
    /// `embeddings` enables the semantic signal. Progress is reported after
    /// every claim. Returns [`AnalysisError::Cancelled`] if `cancel` is set
    /// before all claims are processed.
    pub async fn run(
        &self,
        claims: &[Claim],
        embeddings: Option<&EmbeddingIndex>,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationFlag>,
    ) -> deponent_core::Result<OrchestrationResult> {
        let span = info_span!(
            "deponent.classify",
            claims = claims.len(),
            semantic = embeddings.is_some(),
            pairs_analyzed = tracing::field::Empty,
            contradictions = tracing::field::Empty,
        );
        let result = self
            .run_claims(claims, embeddings, progress, cancel)
            .instrument(span.clone())
            .await?;
        span.record("pairs_analyzed", result.statistics.pairs_analyzed);
        span.record("contradictions", result.statistics.total_contradictions);
        Ok(result)
    }

    async fn run_claims(
        &self,
        claims: &[Claim],
        embeddings: Option<&EmbeddingIndex>,
        progress: Option<&dyn ProgressSink>,
        cancel: Option<&CancellationFlag>,
    ) -> deponent_core::Result<OrchestrationResult> {
        let total = claims.len();
        let mut state = RunState::default();

        for (i, claim) in claims.iter().enumerate() {
            if cancel.is_some_and(CancellationFlag::is_cancelled) {
                warn!(processed = i, total, "Analysis cancelled");
                return Err(AnalysisError::Cancelled {
                    claims_processed: i,
                    total_claims: total,
                });
            }

            let candidates = self.generator.generate(claim, claims, embeddings);
            debug!(claim = %claim.id, candidates = candidates.len(), "Candidates generated");
            self.process_pairs(&mut state, &candidates).await;

            emit(
                progress,
                AnalysisProgress::ClaimAnalyzed {
                    processed: i + 1,
                    total,
                    contradictions_so_far: state.contradictions.len(),
                },
            );
        }

        let mut statistics = AnalysisStatistics::from_contradictions(total, &state.contradictions);
        statistics.pairs_analyzed = state.pairs_analyzed;
        statistics.pairs_failed = state.pairs_failed;
        statistics.pairs_skipped = state.pairs_skipped;

        info!(
            claims = total,
            pairs_analyzed = statistics.pairs_analyzed,
            pairs_failed = statistics.pairs_failed,
            pairs_skipped = statistics.pairs_skipped,
            contradictions = statistics.total_contradictions,
            "Contradiction analysis complete"
        );

        Ok(OrchestrationResult {
            contradictions: state.contradictions,
            statistics,
        })
    }

    async fn process_pairs(&self, state: &mut RunState, pairs: &[CandidatePair<'_>]) {
        for pair in pairs {
            let (a, b) = (pair.claim_a, pair.claim_b);

            let key = pair_key(&a.id, &b.id);
            if !state.seen.insert(key) {
                continue;
            }

            if let Err(violation) = check_pair(a, b) {
                warn!(claim_a = %a.id, claim_b = %b.id, %violation, "Dropping invalid pair");
                state.pairs_skipped += 1;
                continue;
            }

            if state.calls_made > 0 && !self.classify_delay.is_zero() {
                tokio::time::sleep(self.classify_delay).await;
            }
            state.calls_made += 1;

            match self.classifier.classify_pair(a, b).await {
                Ok(judgment) => {
                    state.pairs_analyzed += 1;
                    let Some(contradiction_type) = judgment.label.contradiction_type() else {
                        continue;
                    };
                    debug!(
                        claim_a = %a.id,
                        claim_b = %b.id,
                        kind = %contradiction_type,
                        confidence = judgment.confidence,
                        "Contradiction found"
                    );
                    state.contradictions.push(Contradiction {
                        id: contradiction_id(state.contradictions.len() + 1),
                        claim_a: a.clone(),
                        claim_b: b.clone(),
                        contradiction_type,
                        explanation: judgment.explanation,
                        confidence: judgment.confidence.clamp(0.0, 1.0),
                    });
                }
                Err(e) => {
                    warn!("Classification failed for {} / {}: {:#}", a.id, b.id, e);
                    state.pairs_failed += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PairJudgment;
    use async_trait::async_trait;
    use deponent_core::{CandidateReason, CitationAnchor, ContradictionType, PairLabel, Role, Utterance};
    use std::sync::Mutex;

    /// Returns HARD_CONTRADICTION for pairs whose texts disagree on "not",
    /// fails for pairs listed in `failing`, and CONSISTENT otherwise.
    #[derive(Default)]
    struct MockClassifier {
        calls: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl PairClassifier for MockClassifier {
        async fn classify_pair(&self, a: &Claim, b: &Claim) -> anyhow::Result<PairJudgment> {
            let key = pair_key(&a.id, &b.id).to_string();
            self.calls.lock().unwrap().push(key.clone());
            if self.failing.contains(&key) {
                anyhow::bail!("malformed response");
            }
            let negated_a = a.normalized_text.contains(" not ");
            let negated_b = b.normalized_text.contains(" not ");
            let label = if negated_a != negated_b {
                PairLabel::HardContradiction
            } else {
                PairLabel::Consistent
            };
            Ok(PairJudgment {
                label,
                explanation: "negation".into(),
                confidence: 0.9,
            })
        }
    }

    fn claim(id: &str, utterance: &str, text: &str, entity: &str) -> Claim {
        let u = Utterance {
            id: utterance.into(),
            document_id: "depo".into(),
            page_number: 1,
            line_start: Some(1),
            line_end: Some(1),
            role: Role::Answer,
            speaker: "WITNESS".into(),
            text: text.into(),
            citation: CitationAnchor::line(1, 1),
        };
        let mut c = Claim::from_utterance(id, &u, text);
        c.entities.insert(entity.into());
        c
    }

    fn no_delay() -> OrchestratorConfig {
        OrchestratorConfig {
            classify_delay: Duration::ZERO,
            ..OrchestratorConfig::default()
        }
    }

    fn three_claims() -> Vec<Claim> {
        vec![
            claim("c1", "u2", "I was present at the meeting", "meeting"),
            claim("c2", "u4", "I was not present at the meeting", "meeting"),
            claim("c3", "u6", "I was present at the meeting all day", "meeting"),
        ]
    }

    #[tokio::test]
    async fn test_each_pair_classified_once() {
        let classifier = Arc::new(MockClassifier::default());
        let orchestrator = ContradictionOrchestrator::new(classifier.clone(), no_delay());
        let result = orchestrator.run(&three_claims(), None, None, None).await.unwrap();

        let calls = classifier.calls.lock().unwrap();
        let unique: HashSet<_> = calls.iter().collect();
        assert_eq!(calls.len(), 3);
        assert_eq!(unique.len(), 3);
        assert_eq!(result.statistics.pairs_analyzed, 3);
        assert_eq!(result.statistics.total_contradictions, 2);
        assert_eq!(result.statistics.count(ContradictionType::HardContradiction), 2);
        assert_eq!(result.contradictions[0].id, "contradiction-0001");
        assert_eq!(result.contradictions[1].id, "contradiction-0002");
    }

    #[tokio::test]
    async fn test_failure_is_isolated_and_not_retried() {
        let classifier = Arc::new(MockClassifier {
            failing: vec!["c1|c2".into()],
            ..MockClassifier::default()
        });
        let orchestrator = ContradictionOrchestrator::new(classifier.clone(), no_delay());
        let result = orchestrator.run(&three_claims(), None, None, None).await.unwrap();

        let calls = classifier.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|k| *k == "c1|c2").count(), 1);
        assert_eq!(result.statistics.pairs_failed, 1);
        assert_eq!(result.statistics.pairs_analyzed, 2);
        assert_eq!(result.statistics.total_contradictions, 1);
    }

    #[tokio::test]
    async fn test_invalid_pairs_skipped_before_call() {
        let classifier = Arc::new(MockClassifier::default());
        let orchestrator = ContradictionOrchestrator::new(classifier.clone(), no_delay());
        let a = claim("c1", "u2", "I was present", "x");
        let b = claim("c2", "u2", "I was not present", "x");
        let pairs = [
            CandidatePair {
                claim_a: &a,
                claim_b: &a,
                similarity: 1.0,
                reason: CandidateReason::Entity,
            },
            CandidatePair {
                claim_a: &a,
                claim_b: &b,
                similarity: 0.8,
                reason: CandidateReason::Entity,
            },
        ];
        let mut state = RunState::default();
        orchestrator.process_pairs(&mut state, &pairs).await;
        assert_eq!(state.pairs_skipped, 2);
        assert!(classifier.calls.lock().unwrap().is_empty());
        assert!(state.contradictions.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_between_claims() {
        let classifier = Arc::new(MockClassifier::default());
        let orchestrator = ContradictionOrchestrator::new(classifier.clone(), no_delay());
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        let sink = move |event: &AnalysisProgress| {
            if let AnalysisProgress::ClaimAnalyzed { processed: 1, .. } = event {
                handle.cancel();
            }
        };

        let err = orchestrator
            .run(&three_claims(), None, Some(&sink), Some(&flag))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Cancelled {
                claims_processed: 1,
                total_claims: 3
            }
        ));
        // Only the first claim's candidates were classified.
        assert_eq!(classifier.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_calls_only() {
        let classifier = Arc::new(MockClassifier::default());
        let config = OrchestratorConfig {
            classify_delay: Duration::from_millis(200),
            ..OrchestratorConfig::default()
        };
        let orchestrator = ContradictionOrchestrator::new(classifier, config);
        let start = tokio::time::Instant::now();
        let result = orchestrator.run(&three_claims(), None, None, None).await.unwrap();
        assert_eq!(result.statistics.pairs_analyzed, 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400) && elapsed < Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_progress_after_each_claim() {
        let orchestrator =
            ContradictionOrchestrator::new(Arc::new(MockClassifier::default()), no_delay());
        let events = Mutex::new(Vec::new());
        let sink = |event: &AnalysisProgress| events.lock().unwrap().push(event.clone());
        orchestrator
            .run(&three_claims(), None, Some(&sink), None)
            .await
            .unwrap();
        let processed: Vec<usize> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                AnalysisProgress::ClaimAnalyzed { processed, .. } => Some(*processed),
                _ => None,
            })
            .collect();
        assert_eq!(processed, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_consistent_pairs_produce_nothing() {
        let claims = vec![
            claim("c1", "u2", "I drove the truck", "truck"),
            claim("c2", "u4", "I drove the truck on Monday", "truck"),
        ];
        let orchestrator =
            ContradictionOrchestrator::new(Arc::new(MockClassifier::default()), no_delay());
        let result = orchestrator.run(&claims, None, None, None).await.unwrap();
        assert!(result.contradictions.is_empty());
        assert_eq!(result.statistics.pairs_analyzed, 1);
        assert_eq!(result.statistics.total_claims, 2);
    }
}
