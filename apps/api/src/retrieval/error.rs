use thiserror::Error;

/// Errors raised while building or querying a candidate corpus.
///
/// An empty corpus is deliberately absent: retrieval against zero candidates
/// yields an empty ranking, never an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorpusError {
    #[error("Candidate '{0}' is already indexed")]
    DuplicateId(String),

    #[error("Candidate '{0}' not found")]
    NotFound(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Candidate id cannot be empty")]
    EmptyId,

    #[error("Candidate '{0}' has empty normalized text")]
    EmptyText(String),

    #[error("Embedding for '{0}' contains non-finite values")]
    NonFiniteEmbedding(String),

    #[error("Index task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CorpusError {
    fn from(e: tokio::task::JoinError) -> Self {
        CorpusError::Task(e.to_string())
    }
}
