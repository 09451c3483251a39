//! Replay engine: loads dialogue history and answers live questions from it.

use crate::error::EngineError;
use crate::result::MatchResult;
use log::{debug, info, warn};
use reprise_history::{LogParser, Pair, extract_pairs};
use reprise_match::{MatcherKind, SimilarityMatcher};
use std::path::{Path, PathBuf};

/// Query counters for one engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Queries evaluated, excluding cached `match_info` lookups.
    pub queries: usize,
    /// Queries whose best candidate met the threshold.
    pub hits: usize,
}

impl ReplayStats {
    /// Fraction of queries that hit, or 0 with no queries.
    pub fn hit_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.hits as f64 / self.queries as f64
        }
    }
}

enum EngineState {
    Unloaded,
    Loaded { pairs: Vec<Pair> },
}

struct CachedMatch {
    question: String,
    step_id: Option<String>,
    result: MatchResult,
}

/// Composes a parser and a matcher over one dialogue log.
pub struct ReplayEngine {
    source: PathBuf,
    parser: Box<dyn LogParser>,
    matcher: Box<dyn SimilarityMatcher>,
    threshold: f64,
    state: EngineState,
    last_match: Option<CachedMatch>,
    stats: ReplayStats,
}

impl ReplayEngine {
    /// Create an unloaded engine; call [`ReplayEngine::load`] before querying.
    pub fn new(
        source: impl Into<PathBuf>,
        parser: Box<dyn LogParser>,
        matcher: Box<dyn SimilarityMatcher>,
        threshold: f64,
    ) -> Self {
        Self {
            source: source.into(),
            parser,
            matcher,
            threshold,
            state: EngineState::Unloaded,
            last_match: None,
            stats: ReplayStats::default(),
        }
    }

    /// Parse the log, extract pairs, and index them for matching.
    ///
    /// Returns the number of candidate pairs. On failure the engine stays
    /// unloaded and every query reports no match.
    pub fn load(&mut self) -> Result<usize, EngineError> {
        self.state = EngineState::Unloaded;
        self.last_match = None;

        let records = self.parser.parse_path(&self.source)?;
        let pairs = extract_pairs(&records);
        if pairs.is_empty() {
            warn!(
                "no dialogue pairs extracted (path={}, records={})",
                self.source.display(),
                records.len()
            );
            return Err(EngineError::NoPairs(self.source.clone()));
        }

        let pairs = self.matcher.index(&self.source, pairs)?;
        if pairs.is_empty() {
            warn!(
                "no usable dialogue pairs after indexing (path={}, matcher={})",
                self.source.display(),
                self.matcher.kind()
            );
            return Err(EngineError::NoPairs(self.source.clone()));
        }

        let count = pairs.len();
        info!(
            "loaded dialogue history (path={}, matcher={}, pairs={count}, threshold={})",
            self.source.display(),
            self.matcher.kind(),
            self.threshold
        );
        self.state = EngineState::Loaded { pairs };
        Ok(count)
    }

    /// Score a live question against history.
    ///
    /// Candidates are restricted to `step_id` when any pair carries it.
    /// Never fails: an unloaded engine or a provider error yields an
    /// unmatched result.
    pub fn query(&mut self, question: &str, step_id: Option<&str>) -> MatchResult {
        let result = self.evaluate(question, step_id);
        self.stats.queries += 1;
        if result.matched {
            self.stats.hits += 1;
        }
        self.last_match = Some(CachedMatch {
            question: question.to_string(),
            step_id: step_id.map(str::to_string),
            result: result.clone(),
        });
        result
    }

    /// The historical answer to replay, if the best match meets the threshold.
    pub fn answer(&mut self, question: &str, step_id: Option<&str>) -> Option<String> {
        let result = self.query(question, step_id);
        result.replay_answer().map(str::to_string)
    }

    /// Diagnostics for a question, reusing the last result for the same query.
    pub fn match_info(&mut self, question: &str, step_id: Option<&str>) -> MatchResult {
        if let Some(cached) = self.last_match.as_ref().filter(|cached| {
            cached.question == question && cached.step_id.as_deref() == step_id
        }) {
            debug!("reusing cached match diagnostics");
            return cached.result.clone();
        }
        self.query(question, step_id)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, EngineState::Loaded { .. })
    }

    /// Candidate pairs; empty until loaded.
    pub fn pairs(&self) -> &[Pair] {
        match &self.state {
            EngineState::Loaded { pairs } => pairs,
            EngineState::Unloaded => &[],
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn matcher_kind(&self) -> MatcherKind {
        self.matcher.kind()
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    fn evaluate(&self, question: &str, step_id: Option<&str>) -> MatchResult {
        let EngineState::Loaded { pairs } = &self.state else {
            warn!(
                "replay engine queried before load (path={})",
                self.source.display()
            );
            return MatchResult::unmatched(self.threshold, 0);
        };

        let pool = candidate_pool(pairs, step_id);
        match self.matcher.best_match(question, &pool) {
            Ok(Some(best)) => {
                let result = MatchResult::from_best(
                    pool[best.index],
                    best.similarity,
                    self.threshold,
                    pool.len(),
                );
                debug!(
                    "replay query scored (similarity={:.3}, threshold={}, matched={}, pool={})",
                    result.similarity,
                    result.threshold,
                    result.matched,
                    result.candidate_pool_size
                );
                result
            }
            Ok(None) => MatchResult::unmatched(self.threshold, pool.len()),
            Err(err) => {
                warn!("replay query failed (error={err})");
                MatchResult::unmatched(self.threshold, pool.len())
            }
        }
    }
}

/// Pairs of the requested step, or every pair when none carry it.
fn candidate_pool<'a>(pairs: &'a [Pair], step_id: Option<&str>) -> Vec<&'a Pair> {
    if let Some(step_id) = step_id.filter(|step_id| !step_id.is_empty()) {
        let scoped: Vec<&Pair> = pairs.iter().filter(|pair| pair.step_id == step_id).collect();
        if !scoped.is_empty() {
            return scoped;
        }
        debug!("no pairs for step, using full pool (step_id={step_id})");
    }
    pairs.iter().collect()
}
