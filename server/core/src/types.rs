//! Core data types for deposition analysis.
//!
//! Defines the records that flow through the pipeline: citation anchors,
//! utterances produced by the segmenter, claims produced by the external
//! extractor, transient candidate pairs, and classified contradictions.
//!
//! Every record except [`CandidatePair`] is immutable once created and
//! serializes in camelCase for downstream renderers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a source document (one deposition transcript).
pub type DocumentId = String;

/// Identifier of an utterance, unique within a document.
pub type UtteranceId = String;

/// Identifier of a claim, unique within a run.
pub type ClaimId = String;

/// A page/line/offset anchor into a transcript.
///
/// At least one of `line_start` or `char_start` is set when the source text
/// provides it. When both line fields are present, `line_end >= line_start`.
/// See [`crate::citation`] for the canonical string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationAnchor {
    /// 1-based page number.
    pub page: u32,
    /// First transcript line of the cited passage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    /// Last transcript line of the cited passage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    /// Character offset into the raw text, used when lines are unnumbered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_start: Option<usize>,
}

/// Who is speaking in an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Examining attorney (or any non-witness speaker resolved as asking).
    Question,
    /// Testimony given by the witness.
    Answer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Question => "QUESTION",
            Role::Answer => "ANSWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contiguous question or answer turn in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub id: UtteranceId,
    pub document_id: DocumentId,
    pub page_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    pub role: Role,
    pub speaker: String,
    pub text: String,
    pub citation: CitationAnchor,
}

impl Utterance {
    pub fn is_answer(&self) -> bool {
        self.role == Role::Answer
    }
}

/// Whether a claim affirms or denies its proposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Affirm,
    Deny,
    #[default]
    Unknown,
}

/// How firmly the witness asserted a claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Certain,
    Uncertain,
    DontRecall,
}

/// One atomic, normalized assertion extracted from an answer.
///
/// The citation is inherited verbatim from the parent utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: ClaimId,
    pub utterance_id: UtteranceId,
    pub document_id: DocumentId,
    pub normalized_text: String,
    pub polarity: Polarity,
    pub modality: Modality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_scope: Option<String>,
    #[serde(default)]
    pub entities: BTreeSet<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    pub citation: CitationAnchor,
}

impl Claim {
    /// Build a claim anchored to `utterance`, copying its provenance fields.
    pub fn from_utterance(
        id: impl Into<ClaimId>,
        utterance: &Utterance,
        normalized_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            utterance_id: utterance.id.clone(),
            document_id: utterance.document_id.clone(),
            normalized_text: normalized_text.into(),
            polarity: Polarity::Unknown,
            modality: Modality::Certain,
            time_scope: None,
            entities: BTreeSet::new(),
            topics: BTreeSet::new(),
            citation: utterance.citation,
        }
    }
}

/// Which signal proposed a candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    Semantic,
    Entity,
    Topic,
    Temporal,
}

/// Two claims proposed for classification. Lives only for one run.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePair<'a> {
    pub claim_a: &'a Claim,
    pub claim_b: &'a Claim,
    /// Score in `[0, 1]`.
    pub similarity: f32,
    pub reason: CandidateReason,
}

/// Contradiction taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContradictionType {
    /// Statements cannot both be true.
    HardContradiction,
    /// Statements are in tension without strict logical conflict.
    SoftInconsistency,
    /// The witness narrowed or widened the scope of an earlier statement.
    ScopeShift,
    /// Incompatible dates, times or sequences.
    TemporalConflict,
    /// The same term is used with shifting meaning.
    DefinitionDrift,
}

impl ContradictionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContradictionType::HardContradiction => "HARD_CONTRADICTION",
            ContradictionType::SoftInconsistency => "SOFT_INCONSISTENCY",
            ContradictionType::ScopeShift => "SCOPE_SHIFT",
            ContradictionType::TemporalConflict => "TEMPORAL_CONFLICT",
            ContradictionType::DefinitionDrift => "DEFINITION_DRIFT",
        }
    }
}

impl fmt::Display for ContradictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label returned by the external pairwise classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairLabel {
    Consistent,
    HardContradiction,
    SoftInconsistency,
    ScopeShift,
    TemporalConflict,
    DefinitionDrift,
}

impl PairLabel {
    /// The contradiction type this label produces, `None` for `Consistent`.
    pub fn contradiction_type(&self) -> Option<ContradictionType> {
        match self {
            PairLabel::Consistent => None,
            PairLabel::HardContradiction => Some(ContradictionType::HardContradiction),
            PairLabel::SoftInconsistency => Some(ContradictionType::SoftInconsistency),
            PairLabel::ScopeShift => Some(ContradictionType::ScopeShift),
            PairLabel::TemporalConflict => Some(ContradictionType::TemporalConflict),
            PairLabel::DefinitionDrift => Some(ContradictionType::DefinitionDrift),
        }
    }

    /// Parse a label case-insensitively, accepting spaces or dashes for underscores.
    pub fn parse_label(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "CONSISTENT" => Some(PairLabel::Consistent),
            "HARD_CONTRADICTION" => Some(PairLabel::HardContradiction),
            "SOFT_INCONSISTENCY" => Some(PairLabel::SoftInconsistency),
            "SCOPE_SHIFT" => Some(PairLabel::ScopeShift),
            "TEMPORAL_CONFLICT" => Some(PairLabel::TemporalConflict),
            "DEFINITION_DRIFT" => Some(PairLabel::DefinitionDrift),
            _ => None,
        }
    }
}

/// A classified contradiction between two claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    pub id: String,
    pub claim_a: Claim,
    pub claim_b: Claim,
    #[serde(rename = "type")]
    pub contradiction_type: ContradictionType,
    pub explanation: String,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Identity of the analyzed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub id: DocumentId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deponent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_caption: Option<String>,
}

impl DocumentInfo {
    pub fn new(id: impl Into<DocumentId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            deponent: None,
            case_caption: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance() -> Utterance {
        Utterance {
            id: "doc-u0001".into(),
            document_id: "doc".into(),
            page_number: 3,
            line_start: Some(4),
            line_end: Some(6),
            role: Role::Answer,
            speaker: "WITNESS".into(),
            text: "I was there.".into(),
            citation: CitationAnchor {
                page: 3,
                line_start: Some(4),
                line_end: Some(6),
                char_start: None,
            },
        }
    }

    #[test]
    fn test_claim_inherits_utterance_citation() {
        let u = utterance();
        let claim = Claim::from_utterance("doc-u0001-c1", &u, "witness was present");
        assert_eq!(claim.utterance_id, u.id);
        assert_eq!(claim.document_id, u.document_id);
        assert_eq!(claim.citation, u.citation);
        assert_eq!(claim.polarity, Polarity::Unknown);
    }

    #[test]
    fn test_pair_label_parsing() {
        assert_eq!(PairLabel::parse_label("consistent"), Some(PairLabel::Consistent));
        assert_eq!(
            PairLabel::parse_label("Hard Contradiction"),
            Some(PairLabel::HardContradiction)
        );
        assert_eq!(
            PairLabel::parse_label("scope-shift"),
            Some(PairLabel::ScopeShift)
        );
        assert_eq!(PairLabel::parse_label("maybe"), None);
    }

    #[test]
    fn test_consistent_has_no_contradiction_type() {
        assert!(PairLabel::Consistent.contradiction_type().is_none());
        assert_eq!(
            PairLabel::TemporalConflict.contradiction_type(),
            Some(ContradictionType::TemporalConflict)
        );
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&ContradictionType::DefinitionDrift).unwrap();
        assert_eq!(json, "\"DEFINITION_DRIFT\"");
        let json = serde_json::to_string(&Modality::DontRecall).unwrap();
        assert_eq!(json, "\"dont_recall\"");
        let json = serde_json::to_string(&utterance()).unwrap();
        assert!(json.contains("\"pageNumber\":3"));
        assert!(json.contains("\"role\":\"ANSWER\""));
    }
}
