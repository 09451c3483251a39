//! Test helpers shared across reprise crates.

pub mod cache;
pub mod embedding;
pub mod logs;

pub use cache::MemoryEmbeddingCache;
pub use embedding::{FailingEmbeddingProvider, StubEmbeddingProvider};
pub use logs::{StructuredLogFixture, TextLogFixture};
