//! Error types for embedding and matching.

/// Errors returned by embedding providers.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// None of the configured API key variables are set.
    #[error("missing embedding credentials (checked {vars})")]
    MissingCredentials { vars: String },
    /// HTTP client or transport failure.
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Endpoint answered with a non-success status.
    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The provider returned a different number of vectors than inputs.
    #[error("embedding count mismatch (expected {expected}, got {actual})")]
    CountMismatch { expected: usize, actual: usize },
    /// Response indices are not exactly `0..n`.
    #[error("embedding response index {index:?} at position {position}")]
    UnexpectedIndex {
        position: usize,
        index: Option<usize>,
    },
    /// A single batch exceeded the provider's limit.
    #[error("embedding batch too large ({size} > {max})")]
    BatchTooLarge { size: usize, max: usize },
}

/// Errors returned while indexing or scoring candidates.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Embedding provider failure.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Sidecar IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Sidecar serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
