//! Dialogue history model, log parsers, and pair extraction.

pub mod document;
pub mod error;
pub mod pair;
pub mod parser;
pub mod record;
pub mod writer;

/// Structured log document types.
pub use document::{LogMetadata, MessageRole, Stage, StageMessage, StructuredLog};
/// History error type.
pub use error::HistoryError;
/// Question/answer pair model and extraction.
pub use pair::{Pair, extract_pairs};
/// Parser capability and the two log formats.
pub use parser::{LogFormat, LogParser, StructuredLogParser, TextLogParser};
/// Record model.
pub use record::{DEFAULT_SOURCE, Record, Role};
/// Log writers for both formats.
pub use writer::{LogEntry, StructuredLogBuilder, TextLogWriter, format_block};
