//! Terminal errors of an analysis run.
//!
//! Only input errors and cancellation end a run. Per-utterance extraction
//! failures, per-pair classification failures and embedding failures are
//! recovered where they happen and never surface here.

/// Errors that abort an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The transcript contained no text at all.
    #[error("transcript is empty; nothing to analyze")]
    EmptyTranscript,

    /// Segmentation produced no answer turns.
    #[error(
        "no Q/A pairs found: {questions} question turns but no answers, so there are no claims to analyze; check Q./A. markers"
    )]
    NoAnswers { questions: usize },

    /// Answers were found but the extractor produced no claims from them.
    #[error("no claims to analyze: {answers} answer turns yielded no extractable claims ({failed} failed)")]
    NoClaims { answers: usize, failed: usize },

    /// The caller cancelled the run between claims.
    #[error("analysis cancelled after {claims_processed} of {total_claims} claims")]
    Cancelled {
        claims_processed: usize,
        total_claims: usize,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
