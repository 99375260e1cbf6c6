//! Progress reporting and cancellation for analysis runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Coarse stage of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Segmenting,
    ExtractingClaims,
    Embedding,
    Classifying,
    Reporting,
}

/// One progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisProgress {
    PhaseStarted {
        phase: AnalysisPhase,
    },
    /// An answer utterance was sent to the extractor.
    UtteranceExtracted {
        processed: usize,
        total: usize,
        claims: usize,
        failed: bool,
    },
    /// All candidates of one claim were classified.
    ClaimAnalyzed {
        processed: usize,
        total: usize,
        contradictions_so_far: usize,
    },
    Completed {
        total_claims: usize,
        total_contradictions: usize,
    },
}

/// Receives progress events. Closures implement it directly.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &AnalysisProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&AnalysisProgress) + Send + Sync,
{
    fn report(&self, event: &AnalysisProgress) {
        self(event)
    }
}

pub(crate) fn emit(sink: Option<&dyn ProgressSink>, event: AnalysisProgress) {
    if let Some(sink) = sink {
        sink.report(&event);
    }
}

/// Cooperative cancellation shared between a caller and a run.
///
/// Cloning shares the flag. Runs check it between claims only.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
