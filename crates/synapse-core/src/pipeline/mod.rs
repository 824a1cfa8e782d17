//! Retrieve → grade & filter → generate, as a fixed three-stage state machine.
//!
//! The orchestrator owns the evidence cascade (which graded fragments to trust)
//! and the single conditional edge (generate or stop). Retrieval, grading, and
//! generation are collaborators behind the traits in [`step`].

pub mod builtin;
pub mod cascade;
pub mod grade;
pub mod orchestrator;
pub mod prompt;
pub mod step;
pub mod types;

pub use cascade::{CascadePolicy, Selection, select_evidence};
pub use orchestrator::{Orchestrator, PipelineConfig, StageEventTx};
pub use step::{Generator, Grader, Retriever};
pub use types::{
    EvidenceTier, Fragment, GradeSummary, Outcome, RunState, Stage, StageEvent, Verdict,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The vector index could not be queried at all. Fatal for the run.
#[derive(Debug, thiserror::Error)]
#[error("index unavailable: {source}")]
pub struct IndexUnavailable {
    #[source]
    source: BoxError,
}

impl IndexUnavailable {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Grading one fragment failed. Recovered locally as [`Verdict::Partial`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("grading unavailable: {reason}")]
pub struct GradingUnavailable {
    pub reason: String,
}

impl GradingUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The generator backend errored. Fatal for the run; no templated fallback.
#[derive(Debug, thiserror::Error)]
#[error("generation failed: {source}")]
pub struct GenerationFailed {
    #[source]
    source: BoxError,
}

impl GenerationFailed {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Run-level failure. "No evidence" is not an error; see [`Outcome::Empty`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage: {0}", stage = Stage::Retrieve)]
    IndexUnavailable(#[from] IndexUnavailable),

    #[error("{stage} stage: {0}", stage = Stage::Generate)]
    GenerationFailed(#[from] GenerationFailed),
}

impl PipelineError {
    /// The stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::IndexUnavailable(_) => Stage::Retrieve,
            Self::GenerationFailed(_) => Stage::Generate,
        }
    }

    /// Stable error kind name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IndexUnavailable(_) => "IndexUnavailable",
            Self::GenerationFailed(_) => "GenerationFailed",
        }
    }
}
