//! Error types for the replay engine.

use reprise_history::HistoryError;
use reprise_match::{EmbeddingError, MatchError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned while building or loading a replay engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The dialogue log could not be read or decoded.
    #[error("history source error: {0}")]
    Source(#[from] HistoryError),
    /// The log produced no usable question/answer pairs.
    #[error("no dialogue pairs in {}", .0.display())]
    NoPairs(PathBuf),
    /// Indexing the pairs failed.
    #[error("match error: {0}")]
    Match(#[from] MatchError),
    /// The embedding provider could not be constructed.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
}
