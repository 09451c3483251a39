//! Record model produced by log parsers.

use serde::{Deserialize, Serialize};

/// Source tag used when a log entry does not declare one.
pub const DEFAULT_SOURCE: &str = "chat";

/// Semantic role of a logged turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A question posed by the scripted workflow.
    Question,
    /// An answer given in reply.
    Answer,
}

/// One observed conversational event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Origin-formatted timestamp, kept opaque.
    pub timestamp: String,
    /// Workflow step the event belongs to; empty when unscoped.
    pub step_id: String,
    /// Free-form origin tag such as `chat` or `runCard`.
    pub source: String,
    /// Dialogue round, when recoverable.
    pub round_num: Option<u32>,
    /// Which side of the dialogue this event is.
    pub role: Role,
    /// Turn text, never empty.
    pub text: String,
}

impl Record {
    /// Build a question record with default attribution.
    pub fn question(text: impl Into<String>) -> Self {
        Self::new(Role::Question, text)
    }

    /// Build an answer record with default attribution.
    pub fn answer(text: impl Into<String>) -> Self {
        Self::new(Role::Answer, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            timestamp: String::new(),
            step_id: String::new(),
            source: DEFAULT_SOURCE.to_string(),
            round_num: None,
            role,
            text: text.into(),
        }
    }

    /// Set the step id.
    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = step_id.into();
        self
    }

    /// Set the dialogue round.
    pub fn with_round(mut self, round_num: Option<u32>) -> Self {
        self.round_num = round_num;
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Set the source tag.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Question text, if this record is a question.
    pub fn question_text(&self) -> Option<&str> {
        match self.role {
            Role::Question => Some(&self.text),
            Role::Answer => None,
        }
    }

    /// Answer text, if this record is an answer.
    pub fn answer_text(&self) -> Option<&str> {
        match self.role {
            Role::Answer => Some(&self.text),
            Role::Question => None,
        }
    }
}
