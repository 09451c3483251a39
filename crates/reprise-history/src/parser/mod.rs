//! Log parser capability and format detection.

mod structured;
mod text;

pub use structured::StructuredLogParser;
pub use text::{BLOCK_DELIMITER_WIDTH, TextLogParser};

use crate::error::HistoryError;
use crate::record::Record;
use log::info;
use std::fmt;
use std::path::Path;

/// On-disk dialogue log formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Delimiter-separated text blocks.
    Text,
    /// Stage-grouped JSON document.
    Structured,
}

impl LogFormat {
    /// Detect the format from the file extension (`.json` is structured).
    pub fn from_path(path: &Path) -> Self {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            LogFormat::Structured
        } else {
            LogFormat::Text
        }
    }

    /// Parser for this format.
    pub fn parser(self) -> Box<dyn LogParser> {
        match self {
            LogFormat::Text => Box::new(TextLogParser),
            LogFormat::Structured => Box::new(StructuredLogParser),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Structured => f.write_str("structured"),
        }
    }
}

/// Turns a persisted dialogue log into an ordered record sequence.
///
/// Malformed units inside a log are skipped with a diagnostic; only an
/// unreadable source fails the whole parse.
pub trait LogParser: Send + Sync {
    /// Format handled by this parser.
    fn format(&self) -> LogFormat;

    /// Parse log contents already in memory.
    fn parse_str(&self, contents: &str) -> Result<Vec<Record>, HistoryError>;

    /// Read and parse a log file.
    fn parse_path(&self, path: &Path) -> Result<Vec<Record>, HistoryError> {
        let contents = std::fs::read_to_string(path)?;
        let records = self.parse_str(&contents)?;
        info!(
            "parsed dialogue log (path={}, format={}, records={})",
            path.display(),
            self.format(),
            records.len()
        );
        Ok(records)
    }
}
