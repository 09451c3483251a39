use parking_lot::Mutex;
use reprise_history::Pair;
use reprise_match::{EmbeddingCache, MatchError};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory embedding cache shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryEmbeddingCache {
    entries: Arc<Mutex<HashMap<PathBuf, Vec<Pair>>>>,
    saves: Arc<Mutex<usize>>,
    reject_writes: bool,
}

impl MemoryEmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose writes always fail.
    pub fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    /// Seed an entry for `source`.
    pub fn with_entry(self, source: impl Into<PathBuf>, pairs: Vec<Pair>) -> Self {
        self.entries.lock().insert(source.into(), pairs);
        self
    }

    pub fn entry(&self, source: &Path) -> Option<Vec<Pair>> {
        self.entries.lock().get(source).cloned()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        *self.saves.lock()
    }
}

impl EmbeddingCache for MemoryEmbeddingCache {
    fn load(&self, source: &Path) -> Option<Vec<Pair>> {
        self.entry(source)
    }

    fn save(&self, source: &Path, pairs: &[Pair]) -> Result<(), MatchError> {
        if self.reject_writes {
            return Err(MatchError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cache is read-only",
            )));
        }
        self.entries
            .lock()
            .insert(source.to_path_buf(), pairs.to_vec());
        *self.saves.lock() += 1;
        Ok(())
    }
}
