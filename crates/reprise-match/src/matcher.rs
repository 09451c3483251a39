//! Matcher capability shared by the text and vector strategies.

use crate::error::MatchError;
use reprise_history::Pair;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Scoring strategy implemented by a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherKind {
    /// Character-sequence ratio over raw questions.
    Text,
    /// Cosine similarity over question embeddings.
    Vector,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatcherKind::Text => f.write_str("text"),
            MatcherKind::Vector => f.write_str("vector"),
        }
    }
}

/// Highest-scoring candidate of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch {
    /// Position in the candidate slice passed to `best_match`.
    pub index: usize,
    pub similarity: f64,
}

/// Similarity scoring over reconstructed pairs.
pub trait SimilarityMatcher: Send + Sync {
    /// Strategy implemented by this matcher.
    fn kind(&self) -> MatcherKind;

    /// Prepare pairs loaded from `source` for scoring.
    ///
    /// The returned pairs replace the input as the candidate pool; matchers
    /// may drop unusable pairs or attach derived data such as embeddings.
    fn index(&mut self, source: &Path, pairs: Vec<Pair>) -> Result<Vec<Pair>, MatchError>;

    /// Score `question` against every candidate and return the best one.
    ///
    /// Ties keep the earliest candidate. Returns `None` only when no
    /// candidate could be scored.
    fn best_match(
        &self,
        question: &str,
        candidates: &[&Pair],
    ) -> Result<Option<BestMatch>, MatchError>;
}

/// Pick the first highest score; later candidates must be strictly better.
pub(crate) fn select_best<I>(scores: I) -> Option<BestMatch>
where
    I: IntoIterator<Item = (usize, f64)>,
{
    scores
        .into_iter()
        .fold(None, |best: Option<BestMatch>, (index, similarity)| match best {
            Some(current) if similarity <= current.similarity => Some(current),
            _ => Some(BestMatch { index, similarity }),
        })
}
