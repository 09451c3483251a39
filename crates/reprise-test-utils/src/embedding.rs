use parking_lot::Mutex;
use reprise_match::{EmbeddingError, EmbeddingProvider};
use std::collections::HashMap;
use std::sync::Arc;

/// Deterministic provider: character counts hashed into a fixed number of
/// buckets, so equal texts always embed identically.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dimensions: usize,
    max_batch_size: usize,
    fail_after: Option<usize>,
    fixed: HashMap<String, Vec<f32>>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StubEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            dimensions: 16,
            max_batch_size: 25,
            fail_after: None,
            fixed: HashMap::new(),
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with_vector(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), vector);
        self
    }

    /// Succeed for the first `calls` batches, then fail.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Number of `embed_batch` calls so far, across clones.
    pub fn calls(&self) -> usize {
        self.batches.lock().len()
    }

    /// Every batch received so far.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = self.fixed.get(text) {
            return vector.clone();
        }
        let mut vector = vec![0.0; self.dimensions];
        for ch in text.chars() {
            vector[ch as u32 as usize % self.dimensions] += 1.0;
        }
        vector
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.len() > self.max_batch_size {
            return Err(EmbeddingError::BatchTooLarge {
                size: texts.len(),
                max: self.max_batch_size,
            });
        }
        let mut batches = self.batches.lock();
        if self.fail_after.is_some_and(|limit| batches.len() >= limit) {
            return Err(EmbeddingError::Status {
                status: 503,
                body: "stub provider exhausted".to_string(),
            });
        }
        batches.push(texts.to_vec());
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Provider whose every call fails with a server error.
#[derive(Debug, Clone)]
pub struct FailingEmbeddingProvider {
    message: String,
}

impl FailingEmbeddingProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl EmbeddingProvider for FailingEmbeddingProvider {
    fn max_batch_size(&self) -> usize {
        25
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Status {
            status: 500,
            body: self.message.clone(),
        })
    }
}
