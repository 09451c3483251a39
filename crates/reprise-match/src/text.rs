//! Character-sequence similarity.
//!
//! The score is the classic longest-matching-block ratio `2*M / T`, where `M`
//! is the number of characters covered by recursively found longest common
//! blocks and `T` is the combined length. Long second sequences drop
//! "popular" characters from block seeding, so scores on long texts stay
//! comparable with other tools built on the same heuristic.

use crate::error::MatchError;
use crate::matcher::{BestMatch, MatcherKind, SimilarityMatcher, select_best};
use log::debug;
use reprise_history::Pair;
use std::collections::HashMap;
use std::path::Path;

/// Second-sequence length at which popular characters are discarded.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity of a live query `a` against a historical question `b`, in [0, 1].
///
/// Whitespace runs are collapsed before comparison; an empty side scores 0.
pub fn score(a: &str, b: &str) -> f64 {
    let a = collapse_whitespace(a);
    let b = collapse_whitespace(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    SequenceMatcher::new(&a, &b).ratio()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each character in `b`, minus popular characters.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matched_len() as f64 / total as f64
    }

    /// Total size of the matching blocks.
    fn matched_len(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        matched
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given ranges,
    /// earliest in `a` then in `b` among equals.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_j2len = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular characters never seed a block but may extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }
        (besti, bestj, bestsize)
    }
}

/// Matcher scoring raw question text with [`score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher;

impl TextMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl SimilarityMatcher for TextMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::Text
    }

    fn index(&mut self, source: &Path, pairs: Vec<Pair>) -> Result<Vec<Pair>, MatchError> {
        debug!(
            "indexed pairs for text matching (source={}, pairs={})",
            source.display(),
            pairs.len()
        );
        Ok(pairs)
    }

    fn best_match(
        &self,
        question: &str,
        candidates: &[&Pair],
    ) -> Result<Option<BestMatch>, MatchError> {
        Ok(select_best(
            candidates
                .iter()
                .enumerate()
                .map(|(index, pair)| (index, score(question, &pair.question))),
        ))
    }
}
