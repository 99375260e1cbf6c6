//! Candidate generation: which claims should a claim be compared against?
//!
//! Four signals are evaluated in a fixed order:
//!
//! 1. **semantic**: cosine similarity of embeddings, kept when `>= threshold`
//! 2. **entity**: at least one shared entity (case-insensitive)
//! 3. **topic**: at least one shared topic tag (case-insensitive)
//! 4. **temporal**: both time scopes mention the same four-digit year
//!
//! A claim proposed by an earlier signal is never re-proposed by a later one,
//! so a semantic match keeps its measured score instead of a fixed one.
//! Candidates are then stably sorted by score (descending) and truncated to
//! `top_k`. Claims from the query's own utterance are excluded up front.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::similarity::{cosine_similarity, EmbeddingIndex, EmbeddingLookup};
use crate::types::{CandidatePair, CandidateReason, Claim};

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}\b").expect("year pattern is valid"));

/// Default maximum number of candidates per claim.
pub const DEFAULT_TOP_K: usize = 5;
/// Default minimum cosine similarity for a semantic candidate.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.75;
/// Default fixed score for shared-entity candidates.
pub const DEFAULT_ENTITY_SCORE: f32 = 0.8;
/// Default fixed score for shared-topic candidates.
pub const DEFAULT_TOPIC_SCORE: f32 = 0.7;
/// Default fixed score for shared-year candidates.
pub const DEFAULT_TEMPORAL_SCORE: f32 = 0.75;

/// Ranking knobs for [`CandidateGenerator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateConfig {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub entity_score: f32,
    pub topic_score: f32,
    pub temporal_score: f32,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            entity_score: DEFAULT_ENTITY_SCORE,
            topic_score: DEFAULT_TOPIC_SCORE,
            temporal_score: DEFAULT_TEMPORAL_SCORE,
        }
    }
}

/// Proposes ranked comparison candidates for one claim at a time.
#[derive(Debug, Clone, Default)]
pub struct CandidateGenerator {
    config: CandidateConfig,
}

impl CandidateGenerator {
    pub fn new(config: CandidateConfig) -> Self {
        Self { config }
    }

    /// Rank candidates for `claim` among `all_claims`.
    ///
    /// `embeddings` is optional; without it (or without a usable vector for
    /// `claim`) the semantic signal is skipped and the other three still run.
    pub fn generate<'a>(
        &self,
        claim: &'a Claim,
        all_claims: &'a [Claim],
        embeddings: Option<&EmbeddingIndex>,
    ) -> Vec<CandidatePair<'a>> {
        if self.config.top_k == 0 {
            return Vec::new();
        }

        let eligible: Vec<&'a Claim> = all_claims
            .iter()
            .filter(|other| other.id != claim.id && other.utterance_id != claim.utterance_id)
            .collect();

        let mut proposed: HashSet<&str> = HashSet::new();
        let mut pairs: Vec<CandidatePair<'a>> = Vec::new();
        let mut propose = |other: &'a Claim, similarity: f32, reason: CandidateReason| {
            if proposed.insert(other.id.as_str()) {
                pairs.push(CandidatePair {
                    claim_a: claim,
                    claim_b: other,
                    similarity: similarity.clamp(0.0, 1.0),
                    reason,
                });
            }
        };

        // ── Signal 1: semantic ──
        if let Some(index) = embeddings {
            match index.lookup(&claim.id) {
                Ok(query) => {
                    for &other in &eligible {
                        let Ok(vector) = index.lookup(&other.id) else {
                            continue;
                        };
                        let score = cosine_similarity(query, vector);
                        if score >= self.config.similarity_threshold {
                            propose(other, score, CandidateReason::Semantic);
                        }
                    }
                }
                Err(EmbeddingLookup::Missing) => {
                    debug!(claim_id = %claim.id, "No embedding for claim; semantic signal skipped");
                }
                Err(EmbeddingLookup::DimensionMismatch { expected, actual }) => {
                    debug!(
                        claim_id = %claim.id,
                        expected,
                        actual,
                        "Embedding dimension mismatch; semantic signal skipped"
                    );
                }
            }
        }

        // ── Signal 2: shared entities ──
        let entities = normalized_set(&claim.entities);
        if !entities.is_empty() {
            for &other in &eligible {
                if shares_any(&entities, &other.entities) {
                    propose(other, self.config.entity_score, CandidateReason::Entity);
                }
            }
        }

        // ── Signal 3: shared topics ──
        let topics = normalized_set(&claim.topics);
        if !topics.is_empty() {
            for &other in &eligible {
                if shares_any(&topics, &other.topics) {
                    propose(other, self.config.topic_score, CandidateReason::Topic);
                }
            }
        }

        // ── Signal 4: overlapping years ──
        if let Some(scope) = claim.time_scope.as_deref() {
            let years = year_tokens(scope);
            if !years.is_empty() {
                for &other in &eligible {
                    let overlaps = other
                        .time_scope
                        .as_deref()
                        .is_some_and(|s| year_tokens(s).iter().any(|y| years.contains(y)));
                    if overlaps {
                        propose(other, self.config.temporal_score, CandidateReason::Temporal);
                    }
                }
            }
        }

        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        pairs.truncate(self.config.top_k);
        pairs
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

fn normalized_set(tags: &BTreeSet<String>) -> HashSet<String> {
    tags.iter()
        .map(|t| normalize_tag(t))
        .filter(|t| !t.is_empty())
        .collect()
}

fn shares_any(query: &HashSet<String>, tags: &BTreeSet<String>) -> bool {
    tags.iter().any(|t| query.contains(&normalize_tag(t)))
}

/// Four-digit year tokens in a time-scope string.
pub fn year_tokens(scope: &str) -> HashSet<&str> {
    YEAR_RE.find_iter(scope).map(|m| m.as_str()).collect()
}
