//! # Deponent Core
//!
//! Synchronous building blocks for deposition contradiction analysis.
//!
//! The crate covers everything that does not talk to an external model:
//!
//! - [`citation`]: page/line anchors and their canonical string form
//! - [`segmenter`]: raw transcript text → question/answer [`Utterance`]s
//! - [`similarity`]: cosine similarity and the claim [`EmbeddingIndex`]
//! - [`candidates`]: multi-signal candidate ranking for one claim
//! - [`contradictions`]: pair keys, pair invariants and run statistics
//! - [`report`]: folding contradictions into a [`Report`]
//!
//! Claim extraction, embeddings and pair classification live behind async
//! traits in `deponent_extraction`.

pub mod candidates;
pub mod citation;
pub mod contradictions;
pub mod error;
pub mod report;
pub mod segmenter;
pub mod similarity;
pub mod types;

pub use candidates::{CandidateConfig, CandidateGenerator};
pub use citation::CitationParseError;
pub use contradictions::{
    check_pair, contradiction_id, pair_key, AnalysisStatistics, ConfidenceHistogram, PairKey,
    PairViolation,
};
pub use error::{AnalysisError, Result};
pub use report::{Report, ReportClaim, ReportEntry, ReportStatistics};
pub use segmenter::{
    tag_lines, AlternationResolver, NameRegistryResolver, Segmentation, SpeakerRoleResolver,
    TaggedLine, TranscriptMetadata, TranscriptSegmenter,
};
pub use similarity::{cosine_similarity, EmbeddingIndex};
pub use types::*;
