//! Similarity matchers for dialogue replay: character-sequence ratio and
//! embedding cosine similarity, plus the embedding provider and sidecar cache.

pub mod cache;
pub mod embedding;
pub mod error;
pub mod matcher;
pub mod text;
pub mod vector;

/// Embedding sidecar caches.
pub use cache::{EmbeddingCache, FileEmbeddingCache, NoEmbeddingCache};
/// Embedding provider capability and HTTP client.
pub use embedding::{
    EmbeddingProvider, HttpEmbeddingProvider, default_batch_size_for_model, embed_all,
};
/// Matching error types.
pub use error::{EmbeddingError, MatchError};
/// Matcher capability.
pub use matcher::{BestMatch, MatcherKind, SimilarityMatcher};
/// Character-sequence matcher.
pub use text::{TextMatcher, score};
/// Embedding matcher.
pub use vector::{VectorMatcher, cosine_similarity, normalize_question};
