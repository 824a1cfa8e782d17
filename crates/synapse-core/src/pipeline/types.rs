use std::fmt;

/// A retrieved chunk of source text. Produced by the retriever, read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub content: String,
    /// Opaque source identifier, e.g. `src/config.py:10-42`.
    pub locator: String,
}

impl Fragment {
    #[must_use]
    pub fn new(content: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            locator: locator.into(),
        }
    }
}

/// Relevance of one fragment to one question. Never cached across questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Relevant,
    Partial,
    Irrelevant,
}

impl Verdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevant => "relevant",
            Self::Partial => "partial",
            Self::Irrelevant => "irrelevant",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage names, as reported in events and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieve,
    Grade,
    Generate,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::Grade => "grade_documents",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which branch of the evidence cascade produced the evidence set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceTier {
    /// All relevant fragments plus a few leading partials.
    Relevant,
    /// No relevant fragments; every partial one.
    Partial,
    /// Nothing usable was graded; the first raw retrieval results.
    Floor,
}

impl EvidenceTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevant => "relevant",
            Self::Partial => "partial",
            Self::Floor => "floor",
        }
    }
}

/// Tier counts emitted after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradeSummary {
    pub relevant: usize,
    pub partial: usize,
    pub irrelevant: usize,
    /// Grader calls that failed and were downgraded to partial.
    pub faults: usize,
    pub tier: EvidenceTier,
    pub evidence: usize,
}

/// Mutable state threaded through a single run. Never shared between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub question: String,
    /// Retrieval results until grading completes, the evidence set afterwards.
    pub fragments: Vec<Fragment>,
    pub generation: Option<String>,
}

impl RunState {
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            fragments: Vec::new(),
            generation: None,
        }
    }
}

/// Final result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The generator's answer, verbatim. May be an "I don't know" reply.
    Answer(String),
    /// Retrieval returned nothing, so there was no evidence to answer from.
    Empty,
}

/// Progress notification sent once per completed stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Retrieved { fragments: usize },
    Graded(GradeSummary),
    Generated { answer_chars: usize },
}

impl StageEvent {
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Retrieved { .. } => Stage::Retrieve,
            Self::Graded(_) => Stage::Grade,
            Self::Generated { .. } => Stage::Generate,
        }
    }
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrieved { fragments } => write!(f, "retrieved {fragments} fragments"),
            Self::Graded(s) => write!(
                f,
                "kept {} fragments ({} relevant, {} partial, {} irrelevant, tier: {})",
                s.evidence,
                s.relevant,
                s.partial,
                s.irrelevant,
                s.tier.as_str()
            ),
            Self::Generated { answer_chars } => write!(f, "generated answer ({answer_chars} chars)"),
        }
    }
}
