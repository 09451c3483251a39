//! Question/answer pairs reconstructed from record sequences.

use crate::record::{Record, Role};
use log::debug;
use serde::{Deserialize, Serialize};

/// A reconstructed question/answer unit used as a matching candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pair {
    /// Question text used for matching (possibly a normalized projection).
    pub question: String,
    /// Question text as it appeared in the log.
    pub question_raw: String,
    /// Paired answer text.
    pub answer: String,
    #[serde(default)]
    pub step_id: String,
    #[serde(default)]
    pub round_num: Option<u32>,
    #[serde(default)]
    pub timestamp: String,
    /// Embedding of `question`, attached by the vector matcher.
    #[serde(default, rename = "emb", skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Pair {
    /// Create a pair; returns `None` when either side is blank.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Option<Self> {
        let question = question.into();
        let answer = answer.into();
        if question.trim().is_empty() || answer.trim().is_empty() {
            return None;
        }
        Some(Self {
            question_raw: question.clone(),
            question,
            answer,
            step_id: String::new(),
            round_num: None,
            timestamp: String::new(),
            embedding: None,
        })
    }

    /// Combine a question record with the answer that followed it.
    ///
    /// Attribution prefers the question side and falls back to the answer side.
    pub fn from_records(question: &Record, answer: &Record) -> Option<Self> {
        let mut pair = Self::new(question.text.as_str(), answer.text.as_str())?;
        pair.step_id = prefer_non_empty(&question.step_id, &answer.step_id);
        pair.round_num = question.round_num.or(answer.round_num);
        pair.timestamp = prefer_non_empty(&question.timestamp, &answer.timestamp);
        Some(pair)
    }

    /// Set the step id.
    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = step_id.into();
        self
    }

    /// Replace the matching text with a projection, keeping `question_raw`.
    ///
    /// Returns `None` when the projection is blank.
    pub fn with_question(self, question: impl Into<String>) -> Option<Self> {
        let question = question.into();
        if question.trim().is_empty() {
            return None;
        }
        Some(Self { question, ..self })
    }

    /// Attach an embedding vector.
    pub fn with_embedding(self, embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..self
        }
    }

    /// Whether an embedding has been attached.
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

fn prefer_non_empty(primary: &str, fallback: &str) -> String {
    if primary.is_empty() {
        fallback.to_string()
    } else {
        primary.to_string()
    }
}

/// Reconstruct question/answer pairs using the most-recent-question rule.
///
/// Every answer is paired with the latest question seen before it. A question
/// that is never answered is dropped once a newer question arrives, and
/// answers before the first question produce nothing.
pub fn extract_pairs(records: &[Record]) -> Vec<Pair> {
    let (_, pairs) = records.iter().fold(
        (None::<&Record>, Vec::new()),
        |(last_question, mut pairs), record| match record.role {
            Role::Question => (Some(record), pairs),
            Role::Answer => {
                if let Some(question) = last_question {
                    pairs.extend(Pair::from_records(question, record));
                }
                (last_question, pairs)
            }
        },
    );
    debug!(
        "extracted dialogue pairs (records={}, pairs={})",
        records.len(),
        pairs.len()
    );
    pairs
}
