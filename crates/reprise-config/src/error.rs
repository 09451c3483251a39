//! Config loading and validation errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{label} is not valid json5: {source}")]
    Syntax {
        label: String,
        #[source]
        source: json5::Error,
    },
    /// The merged document did not deserialize into `ReplayConfig`.
    #[error("config does not match the replay schema: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field failed schema or range validation; `path` is the JSON path.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
