//! Embedding-based similarity over normalized questions.

use crate::cache::EmbeddingCache;
use crate::embedding::{EmbeddingProvider, embed_all};
use crate::error::{EmbeddingError, MatchError};
use crate::matcher::{BestMatch, MatcherKind, SimilarityMatcher, select_best};
use log::{debug, info, warn};
use regex::Regex;
use reprise_history::Pair;
use std::path::Path;
use std::sync::LazyLock;

const THINK_TAG_PATTERN: &str = r"</?think[^>]*>";
const QUESTION_CLAUSE_PATTERN: &str = r"[^。！？\n\r]*[？\?]";
const NORM_EPSILON: f64 = 1e-9;

static THINK_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(THINK_TAG_PATTERN).ok());
static QUESTION_CLAUSE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(QUESTION_CLAUSE_PATTERN).ok());

/// Reduce a question to the text worth embedding.
///
/// Reasoning tags are removed, then the last clause ending in a question mark
/// is kept when there is one.
pub fn normalize_question(text: &str) -> String {
    let Some(think_tag) = THINK_TAG.as_ref() else {
        return text.trim().to_string();
    };
    let stripped = think_tag.replace_all(text, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return String::new();
    }
    let Some(clause) = QUESTION_CLAUSE.as_ref() else {
        return stripped.to_string();
    };
    match clause.find_iter(stripped).last() {
        Some(found) => found.as_str().trim().to_string(),
        None => stripped.to_string(),
    }
}

/// Cosine similarity, or `None` when the vectors differ in length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (x, y)| {
            let (x, y) = (f64::from(*x), f64::from(*y));
            (dot + x * y, norm_a + x * x, norm_b + y * y)
        },
    );
    Some(dot / (norm_a.sqrt() * norm_b.sqrt() + NORM_EPSILON))
}

/// Matcher comparing question embeddings by cosine similarity.
pub struct VectorMatcher {
    provider: Box<dyn EmbeddingProvider>,
    cache: Box<dyn EmbeddingCache>,
}

impl VectorMatcher {
    pub fn new(provider: Box<dyn EmbeddingProvider>, cache: Box<dyn EmbeddingCache>) -> Self {
        Self { provider, cache }
    }
}

impl SimilarityMatcher for VectorMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Vector
    }

    fn index(&mut self, source: &Path, pairs: Vec<Pair>) -> Result<Vec<Pair>, MatchError> {
        if let Some(cached) = self.cache.load(source) {
            if !cached.is_empty() && cached.iter().all(Pair::has_embedding) {
                info!(
                    "loaded embedding index from cache (source={}, pairs={})",
                    source.display(),
                    cached.len()
                );
                return Ok(cached);
            }
            debug!(
                "embedding cache incomplete, recomputing (source={})",
                source.display()
            );
        }

        let total = pairs.len();
        let pairs: Vec<Pair> = pairs
            .into_iter()
            .filter_map(|pair| {
                let question = normalize_question(&pair.question_raw);
                pair.with_question(question)
            })
            .collect();
        if pairs.len() < total {
            debug!(
                "dropped pairs with empty normalized question (dropped={})",
                total - pairs.len()
            );
        }
        if pairs.is_empty() {
            return Ok(pairs);
        }

        let texts: Vec<String> = pairs.iter().map(|pair| pair.question.clone()).collect();
        let embeddings = embed_all(self.provider.as_ref(), &texts)?;
        let pairs: Vec<Pair> = pairs
            .into_iter()
            .zip(embeddings)
            .map(|(pair, embedding)| pair.with_embedding(embedding))
            .collect();
        info!(
            "built embedding index (source={}, pairs={})",
            source.display(),
            pairs.len()
        );

        if let Err(err) = self.cache.save(source, &pairs) {
            warn!(
                "failed to write embedding cache (source={}, error={err})",
                source.display()
            );
        }
        Ok(pairs)
    }

    fn best_match(
        &self,
        question: &str,
        candidates: &[&Pair],
    ) -> Result<Option<BestMatch>, MatchError> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let query = normalize_question(question);
        if query.is_empty() {
            debug!("query normalized to empty text");
            return Ok(None);
        }
        let query_embedding = embed_all(self.provider.as_ref(), &[query])?
            .into_iter()
            .next()
            .ok_or(EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        let scores = candidates.iter().enumerate().filter_map(|(index, pair)| {
            let embedding = pair.embedding.as_deref()?;
            match cosine_similarity(&query_embedding, embedding) {
                Some(similarity) => Some((index, similarity)),
                None => {
                    warn!(
                        "skipping candidate with mismatched embedding length (index={index}, expected={}, actual={})",
                        query_embedding.len(),
                        embedding.len()
                    );
                    None
                }
            }
        });
        Ok(select_best(scores))
    }
}

#[cfg(test)]
mod tests {
    use super::{QUESTION_CLAUSE, THINK_TAG, cosine_similarity, normalize_question};
    use pretty_assertions::assert_eq;

    #[test]
    fn patterns_compile_once_and_are_reused() {
        assert!(THINK_TAG.is_some());
        assert!(QUESTION_CLAUSE.is_some());
        let first = normalize_question("<think></think>开场白。你准备好了吗？");
        let second = normalize_question("<think></think>开场白。你准备好了吗？");
        assert_eq!(first, "你准备好了吗？");
        assert_eq!(first, second);
    }

    #[test]
    fn think_tags_are_removed() {
        assert_eq!(
            normalize_question("<think>reasoning</think> 你准备好了吗？"),
            "reasoning 你准备好了吗？"
        );
        assert_eq!(normalize_question("<think type=\"x\"></think>"), "");
    }

    #[test]
    fn last_question_clause_is_kept() {
        assert_eq!(
            normalize_question("很好。接下来我们讨论第二题！你怎么看？"),
            "你怎么看？"
        );
        assert_eq!(
            normalize_question("First point? Second point?\nThird one?"),
            "Third one?"
        );
    }

    #[test]
    fn text_without_question_is_kept_whole() {
        assert_eq!(normalize_question("  请介绍一下你自己。 "), "请介绍一下你自己。");
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let similarity = cosine_similarity(&[0.3, 0.4, 0.5], &[0.3, 0.4, 0.5]).expect("same len");
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), Some(0.0));
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), Some(0.0));
    }

    #[test]
    fn cosine_rejects_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
    }
}
