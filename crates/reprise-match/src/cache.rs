//! Embedding sidecar caches keyed by source log path.

use crate::error::MatchError;
use log::{debug, info, warn};
use reprise_config::CacheConfig;
use reprise_history::Pair;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Persisted embedded pairs for a source log.
pub trait EmbeddingCache: Send + Sync {
    /// Cached pairs for `source`, or `None` when absent or unreadable.
    fn load(&self, source: &Path) -> Option<Vec<Pair>>;

    /// Persist embedded pairs for `source`.
    fn save(&self, source: &Path, pairs: &[Pair]) -> Result<(), MatchError>;
}

/// Sidecar file written next to the source log as `<stem><suffix>`.
#[derive(Debug, Clone)]
pub struct FileEmbeddingCache {
    suffix: String,
}

impl FileEmbeddingCache {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.suffix.clone())
    }

    /// Sidecar location for a source log.
    pub fn sidecar_path(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        source.with_file_name(format!("{stem}{}", self.suffix))
    }
}

impl EmbeddingCache for FileEmbeddingCache {
    fn load(&self, source: &Path) -> Option<Vec<Pair>> {
        let path = self.sidecar_path(source);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no embedding sidecar (path={})", path.display());
                return None;
            }
            Err(err) => {
                warn!(
                    "failed to read embedding sidecar (path={}, error={err})",
                    path.display()
                );
                return None;
            }
        };
        match serde_json::from_str::<Vec<Pair>>(&contents) {
            Ok(pairs) => {
                debug!(
                    "read embedding sidecar (path={}, pairs={})",
                    path.display(),
                    pairs.len()
                );
                Some(pairs)
            }
            Err(err) => {
                warn!(
                    "ignoring malformed embedding sidecar (path={}, error={err})",
                    path.display()
                );
                None
            }
        }
    }

    fn save(&self, source: &Path, pairs: &[Pair]) -> Result<(), MatchError> {
        let path = self.sidecar_path(source);
        let json = serde_json::to_string(pairs)?;
        fs::write(&path, json)?;
        info!(
            "wrote embedding sidecar (path={}, pairs={})",
            path.display(),
            pairs.len()
        );
        Ok(())
    }
}

/// Cache that never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmbeddingCache;

impl EmbeddingCache for NoEmbeddingCache {
    fn load(&self, _source: &Path) -> Option<Vec<Pair>> {
        None
    }

    fn save(&self, _source: &Path, _pairs: &[Pair]) -> Result<(), MatchError> {
        Ok(())
    }
}
