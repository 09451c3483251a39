//! Error types for history parsing and log writing.

/// Errors returned while reading or writing dialogue logs.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
