//! Error types for synapse-index.

use std::num::TryFromIntError;

/// Errors that can occur while acquiring, indexing, or searching a repository.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files or project directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Qdrant vector store error.
    #[error("Qdrant error: {0}")]
    Qdrant(Box<qdrant_client::QdrantError>),

    /// LLM provider error (embedding).
    #[error("LLM error: {0}")]
    Llm(#[from] synapse_llm::LlmError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Repository URL rejected by the allow-list.
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    /// `git clone` could not be run or exited unsuccessfully.
    #[error("clone failed: {0}")]
    CloneFailed(String),

    /// The repository contained no indexable text.
    #[error("no indexable documents found in {0}")]
    NoDocuments(String),

    /// Integer conversion error.
    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),
}

impl From<qdrant_client::QdrantError> for IndexError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        Self::Qdrant(Box::new(e))
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
