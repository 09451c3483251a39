//! Outcome of a single replay query.

use reprise_history::Pair;
use serde::Serialize;

/// Diagnostics for one query, reported whether or not the threshold was met.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// `similarity >= threshold` for the best candidate.
    pub matched: bool,
    pub similarity: f64,
    pub threshold: f64,
    /// Best candidate's answer; `None` when no candidate was scored.
    pub answer: Option<String>,
    /// Best candidate's question as logged.
    pub historical_question: Option<String>,
    pub step_id: Option<String>,
    pub round_num: Option<u32>,
    pub timestamp: Option<String>,
    /// Number of pairs considered after step scoping.
    pub candidate_pool_size: usize,
}

impl MatchResult {
    /// Result for a query that produced no scored candidate.
    pub fn unmatched(threshold: f64, candidate_pool_size: usize) -> Self {
        Self {
            matched: false,
            similarity: 0.0,
            threshold,
            answer: None,
            historical_question: None,
            step_id: None,
            round_num: None,
            timestamp: None,
            candidate_pool_size,
        }
    }

    /// Result for the best-scoring candidate.
    pub fn from_best(
        pair: &Pair,
        similarity: f64,
        threshold: f64,
        candidate_pool_size: usize,
    ) -> Self {
        Self {
            matched: similarity >= threshold,
            similarity,
            threshold,
            answer: Some(pair.answer.clone()),
            historical_question: Some(pair.question_raw.clone()),
            step_id: Some(pair.step_id.clone()),
            round_num: pair.round_num,
            timestamp: Some(pair.timestamp.clone()),
            candidate_pool_size,
        }
    }

    /// The answer to replay, present only on a match.
    pub fn replay_answer(&self) -> Option<&str> {
        if self.matched {
            self.answer.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MatchResult;
    use pretty_assertions::assert_eq;
    use reprise_history::Pair;

    #[test]
    fn threshold_is_inclusive() {
        let pair = Pair::new("Q?", "A").expect("pair");
        let result = MatchResult::from_best(&pair, 0.7, 0.7, 1);
        assert!(result.matched);
        assert_eq!(result.replay_answer(), Some("A"));
    }

    #[test]
    fn below_threshold_keeps_diagnostics() {
        let pair = Pair::new("Q?", "A").expect("pair").with_step("s1");
        let result = MatchResult::from_best(&pair, 0.69, 0.7, 3);
        assert!(!result.matched);
        assert_eq!(result.answer.as_deref(), Some("A"));
        assert_eq!(result.replay_answer(), None);
        assert_eq!(result.step_id.as_deref(), Some("s1"));
        assert_eq!(result.candidate_pool_size, 3);
    }

    #[test]
    fn unmatched_result_is_empty() {
        let result = MatchResult::unmatched(0.8, 0);
        assert!(!result.matched);
        assert_eq!(result.similarity, 0.0);
        assert_eq!(result.answer, None);
        assert_eq!(result.replay_answer(), None);
    }
}
