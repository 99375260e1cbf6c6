//! Report aggregation.
//!
//! [`Report::build`] folds a finished contradiction list into the structure
//! handed to renderers. It is pure: identical inputs give identical reports.

use serde::{Deserialize, Serialize};

use crate::contradictions::{AnalysisStatistics, ConfidenceHistogram};
use crate::types::{
    CitationAnchor, Claim, ClaimId, Contradiction, ContradictionType, DocumentInfo, UtteranceId,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    pub total_claims: usize,
    pub total_contradictions: usize,
    pub hard_contradictions: usize,
    pub soft_inconsistencies: usize,
    pub scope_shifts: usize,
    pub temporal_conflicts: usize,
    pub definition_drifts: usize,
    pub confidence: ConfidenceHistogram,
}

impl From<&AnalysisStatistics> for ReportStatistics {
    fn from(stats: &AnalysisStatistics) -> Self {
        Self {
            total_claims: stats.total_claims,
            total_contradictions: stats.total_contradictions,
            hard_contradictions: stats.count(ContradictionType::HardContradiction),
            soft_inconsistencies: stats.count(ContradictionType::SoftInconsistency),
            scope_shifts: stats.count(ContradictionType::ScopeShift),
            temporal_conflicts: stats.count(ContradictionType::TemporalConflict),
            definition_drifts: stats.count(ContradictionType::DefinitionDrift),
            confidence: stats.confidence,
        }
    }
}

/// One side of a report entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportClaim {
    pub claim_id: ClaimId,
    pub utterance_id: UtteranceId,
    pub text: String,
    pub citation: CitationAnchor,
    /// Canonical citation string, e.g. `p. 12:5-8`.
    pub citation_text: String,
}

impl From<&Claim> for ReportClaim {
    fn from(claim: &Claim) -> Self {
        Self {
            claim_id: claim.id.clone(),
            utterance_id: claim.utterance_id.clone(),
            text: claim.normalized_text.clone(),
            citation: claim.citation,
            citation_text: claim.citation.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub contradiction_type: ContradictionType,
    pub explanation: String,
    pub confidence: f32,
    pub claim_a: ReportClaim,
    pub claim_b: ReportClaim,
}

impl From<&Contradiction> for ReportEntry {
    fn from(c: &Contradiction) -> Self {
        Self {
            id: c.id.clone(),
            contradiction_type: c.contradiction_type,
            explanation: c.explanation.clone(),
            confidence: c.confidence,
            claim_a: ReportClaim::from(&c.claim_a),
            claim_b: ReportClaim::from(&c.claim_b),
        }
    }
}

/// Final analysis report for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub document: DocumentInfo,
    pub statistics: ReportStatistics,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    /// Build a report. Entries keep the order of `contradictions`.
    pub fn build(
        document: DocumentInfo,
        claims: &[Claim],
        contradictions: &[Contradiction],
    ) -> Self {
        let stats = AnalysisStatistics::from_contradictions(claims.len(), contradictions);
        Self {
            document,
            statistics: ReportStatistics::from(&stats),
            entries: contradictions.iter().map(ReportEntry::from).collect(),
        }
    }

    /// Entries of one contradiction type.
    pub fn entries_of(&self, ty: ContradictionType) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.contradiction_type == ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, Utterance};

    fn utterance(id: &str, line: u32) -> Utterance {
        Utterance {
            id: id.into(),
            document_id: "doc".into(),
            page_number: 2,
            line_start: Some(line),
            line_end: Some(line),
            role: Role::Answer,
            speaker: "WITNESS".into(),
            text: String::new(),
            citation: CitationAnchor::line(2, line),
        }
    }

    fn contradiction(n: usize, ty: ContradictionType, confidence: f32) -> Contradiction {
        Contradiction {
            id: crate::contradictions::contradiction_id(n),
            claim_a: Claim::from_utterance("a", &utterance("u1", 4), "I was present"),
            claim_b: Claim::from_utterance("b", &utterance("u2", 9), "I was not present"),
            contradiction_type: ty,
            explanation: "direct negation".into(),
            confidence,
        }
    }

    #[test]
    fn test_build_counts_by_type() {
        let claims = vec![
            Claim::from_utterance("a", &utterance("u1", 4), "x"),
            Claim::from_utterance("b", &utterance("u2", 9), "y"),
        ];
        let list = vec![
            contradiction(1, ContradictionType::HardContradiction, 0.9),
            contradiction(2, ContradictionType::SoftInconsistency, 0.55),
            contradiction(3, ContradictionType::DefinitionDrift, 0.3),
        ];
        let report = Report::build(DocumentInfo::new("doc", "Depo"), &claims, &list);
        assert_eq!(report.statistics.total_claims, 2);
        assert_eq!(report.statistics.total_contradictions, 3);
        assert_eq!(report.statistics.hard_contradictions, 1);
        assert_eq!(report.statistics.soft_inconsistencies, 1);
        assert_eq!(report.statistics.definition_drifts, 1);
        assert_eq!(report.statistics.scope_shifts, 0);
        assert_eq!(report.statistics.confidence.total(), 3);
        assert_eq!(report.entries_of(ContradictionType::DefinitionDrift).count(), 1);
    }

    #[test]
    fn test_entries_carry_citations() {
        let list = vec![contradiction(1, ContradictionType::HardContradiction, 0.9)];
        let report = Report::build(DocumentInfo::new("doc", "Depo"), &[], &list);
        let entry = &report.entries[0];
        assert_eq!(entry.claim_a.text, "I was present");
        assert_eq!(entry.claim_a.citation_text, "p. 2:4");
        assert_eq!(entry.claim_b.citation_text, "p. 2:9");
        assert_eq!(entry.id, "contradiction-0001");
    }

    #[test]
    fn test_build_is_deterministic() {
        let list = vec![contradiction(1, ContradictionType::ScopeShift, 0.7)];
        let a = Report::build(DocumentInfo::new("doc", "Depo"), &[], &list);
        let b = Report::build(DocumentInfo::new("doc", "Depo"), &[], &list);
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_json_shape() {
        let list = vec![contradiction(1, ContradictionType::HardContradiction, 0.9)];
        let report = Report::build(DocumentInfo::new("doc", "Depo"), &[], &list);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["statistics"]["hardContradictions"], 1);
        assert_eq!(json["entries"][0]["type"], "HARD_CONTRADICTION");
        assert_eq!(json["entries"][0]["claimA"]["citationText"], "p. 2:4");
    }
}
