//! Fuzzy string matching against ordered candidate lists.
//!
//! A [`SimilarityScorer`] rates a query against one candidate on a scale of
//! `0.0..=100.0`. [`best_match`] runs a scorer over a candidate list and
//! returns the highest-scoring entry; thresholds are applied by callers.
//!
//! Two scorers are provided:
//!
//! - [`TokenSetScorer`] ignores token order and duplicated or extra tokens,
//!   which suits addresses such as `"kaufland 4 девня 24"` versus
//!   `"девня 24"`.
//! - [`PartialScorer`] rates the best-aligned substring of the longer input,
//!   which suits short shopping-list terms against long category names.

use std::collections::BTreeSet;

use log::warn;
use rapidfuzz::distance::indel;

/// Upper bound on candidates examined by [`best_match`].
pub const MAX_CANDIDATES: usize = 10_000;

/// Rate the similarity of two strings.
///
/// Implementations must be deterministic and return values within
/// `0.0..=100.0`.
pub trait SimilarityScorer: Send + Sync {
    /// Score `candidate` against `query`.
    fn score(&self, query: &str, candidate: &str) -> f64;
}

/// Indel similarity of two whole strings in `0.0..=100.0`.
///
/// The score is `200 * lcs / (len(left) + len(right))` over characters, the
/// scale both address and category thresholds are expressed in.
///
/// # Examples
/// ```
/// use pazar_core::matching::ratio;
///
/// assert_eq!(ratio("мляко", "мляко"), 100.0);
/// assert_eq!(ratio("", ""), 100.0);
/// assert_eq!(ratio("abcd", "bacd"), 75.0);
/// assert!(ratio("мляко", "масло") < 100.0);
/// ```
#[must_use]
pub fn ratio(left: &str, right: &str) -> f64 {
    let similarity = indel::normalized_similarity(left.chars(), right.chars());
    (similarity * 100.0).clamp(0.0, 100.0)
}

/// Order-insensitive token-set similarity.
///
/// Both inputs are split on whitespace into sets. When the sets share at
/// least one token and one set contains the other, the score is `100`.
/// Otherwise the shared tokens are compared with each side's remainder and
/// the best [`ratio`] is returned. An input without tokens scores `0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSetScorer;

impl SimilarityScorer for TokenSetScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let left: BTreeSet<&str> = query.split_whitespace().collect();
        let right: BTreeSet<&str> = candidate.split_whitespace().collect();
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }

        let shared = join(left.intersection(&right));
        let only_left = join(left.difference(&right));
        let only_right = join(right.difference(&left));

        if !shared.is_empty() && (only_left.is_empty() || only_right.is_empty()) {
            return 100.0;
        }
        if shared.is_empty() {
            return ratio(&only_left, &only_right);
        }

        let with_left = format!("{shared} {only_left}");
        let with_right = format!("{shared} {only_right}");
        ratio(&shared, &with_left)
            .max(ratio(&shared, &with_right))
            .max(ratio(&with_left, &with_right))
    }
}

fn join<'a, 'b: 'a>(tokens: impl Iterator<Item = &'a &'b str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

/// Best-aligned substring similarity.
///
/// The shorter input slides across the longer one a character at a time and
/// the highest window [`ratio`] wins. Two empty inputs score `100`; a single
/// empty input scores `0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartialScorer;

impl SimilarityScorer for PartialScorer {
    fn score(&self, query: &str, candidate: &str) -> f64 {
        let query_chars: Vec<char> = query.chars().collect();
        let candidate_chars: Vec<char> = candidate.chars().collect();
        let (short, long) = if query_chars.len() <= candidate_chars.len() {
            (query_chars, candidate_chars)
        } else {
            (candidate_chars, query_chars)
        };

        match (short.is_empty(), long.is_empty()) {
            (true, true) => return 100.0,
            (true, false) => return 0.0,
            _ => {}
        }

        let needle: String = short.iter().collect();
        let mut best = 0.0_f64;
        for window in long.windows(short.len()) {
            let haystack: String = window.iter().collect();
            best = best.max(ratio(&needle, &haystack));
            if best >= 100.0 {
                break;
            }
        }
        best
    }
}

/// The winning candidate of a [`best_match`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Position of the candidate in the input order.
    pub index: usize,
    /// Similarity reported by the scorer.
    pub score: f64,
}

/// Find the candidate most similar to `query`.
///
/// Returns `None` when `candidates` is empty. Ties keep the earliest
/// candidate. At most [`MAX_CANDIDATES`] entries are examined; see
/// [`best_match_within`] to choose another bound.
///
/// # Examples
/// ```
/// use pazar_core::matching::{TokenSetScorer, best_match};
///
/// let stores = ["девня 24", "владислав варненчик 186"];
/// let found = best_match("kaufland 4 девня 24", &stores, &TokenSetScorer).unwrap();
/// assert_eq!(found.index, 0);
/// assert_eq!(found.score, 100.0);
/// ```
pub fn best_match<I, S>(query: &str, candidates: I, scorer: &dyn SimilarityScorer) -> Option<Match>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    best_match_within(query, candidates, scorer, MAX_CANDIDATES)
}

/// Find the candidate most similar to `query`, examining at most `limit`
/// entries.
///
/// Candidates beyond `limit` are ignored and a warning is logged.
pub fn best_match_within<I, S>(
    query: &str,
    candidates: I,
    scorer: &dyn SimilarityScorer,
    limit: usize,
) -> Option<Match>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<Match> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        if index >= limit {
            warn!("candidate list truncated to {limit} entries while matching '{query}'");
            break;
        }
        let score = scorer.score(query, candidate.as_ref()).clamp(0.0, 100.0);
        if best.is_none_or(|current| score > current.score) {
            best = Some(Match { index, score });
        }
    }
    best
}
