//! Run-wide bookkeeping for contradiction classification.
//!
//! Provides the order-independent [`PairKey`] used to guarantee that each
//! unordered claim pair reaches the classifier at most once per run, the
//! pair invariants re-checked before every classifier call, and the
//! single-pass [`AnalysisStatistics`] computed over a finished result list.
//!
//! # Invariants
//!
//! - `pair_key(a, b) == pair_key(b, a)`.
//! - A pair of claims with the same id or the same utterance id is never valid.
//! - Confidence buckets always sum to the number of contradictions.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Claim, Contradiction, ContradictionType};

/// Lower bound of the `high` confidence bucket.
pub const HIGH_CONFIDENCE: f32 = 0.8;
/// Lower bound of the `medium` confidence bucket.
pub const MEDIUM_CONFIDENCE: f32 = 0.5;

/// Canonical identifier of an unordered claim pair: `"<lower>|<higher>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(String);

impl PairKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order-independent key for two claim ids.
pub fn pair_key(a: &str, b: &str) -> PairKey {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    PairKey(format!("{lo}|{hi}"))
}

/// Why a pair must not be sent to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairViolation {
    SelfComparison,
    SameUtterance,
}

impl fmt::Display for PairViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairViolation::SelfComparison => f.write_str("claim compared with itself"),
            PairViolation::SameUtterance => f.write_str("claims share an utterance"),
        }
    }
}

/// Re-check the pair invariants.
pub fn check_pair(a: &Claim, b: &Claim) -> Result<(), PairViolation> {
    if a.id == b.id {
        return Err(PairViolation::SelfComparison);
    }
    if a.utterance_id == b.utterance_id {
        return Err(PairViolation::SameUtterance);
    }
    Ok(())
}

/// Id of the `n`-th contradiction of a run (1-based).
pub fn contradiction_id(n: usize) -> String {
    format!("contradiction-{n:04}")
}

/// Confidence bucket of a contradiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    pub fn of(confidence: f32) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceBucket::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceHistogram {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceHistogram {
    pub fn record(&mut self, confidence: f32) {
        match ConfidenceBucket::of(confidence) {
            ConfidenceBucket::High => self.high += 1,
            ConfidenceBucket::Medium => self.medium += 1,
            ConfidenceBucket::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Aggregate counts for one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    pub total_claims: usize,
    /// Pairs the classifier answered successfully.
    pub pairs_analyzed: usize,
    /// Pairs whose classifier call failed.
    pub pairs_failed: usize,
    /// Pairs dropped for violating the pair invariants.
    pub pairs_skipped: usize,
    pub total_contradictions: usize,
    pub by_type: BTreeMap<ContradictionType, usize>,
    pub confidence: ConfidenceHistogram,
}

impl AnalysisStatistics {
    /// Compute contradiction counts in one pass over the final list.
    ///
    /// Pair counters are run bookkeeping and are left at zero.
    pub fn from_contradictions(total_claims: usize, contradictions: &[Contradiction]) -> Self {
        let mut stats = Self {
            total_claims,
            total_contradictions: contradictions.len(),
            ..Self::default()
        };
        for c in contradictions {
            *stats.by_type.entry(c.contradiction_type).or_insert(0) += 1;
            stats.confidence.record(c.confidence);
        }
        stats
    }

    pub fn count(&self, ty: ContradictionType) -> usize {
        self.by_type.get(&ty).copied().unwrap_or(0)
    }
}
