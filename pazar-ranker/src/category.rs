//! Map free-text shopping-list terms to product categories.
#![forbid(unsafe_code)]

use log::debug;
use pazar_core::{Category, PartialScorer, best_match};

/// A term resolves to a category only when its score reaches this value.
pub const CATEGORY_MATCH_THRESHOLD: f64 = 70.0;

/// A category selected by [`CategoryMatcher::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryMatch {
    /// Identifier of the matched category.
    pub category_id: u32,
    /// Partial similarity of the match.
    pub score: f64,
}

/// Resolves shopping-list terms against category display names.
///
/// Names are case-folded once at construction. Terms are trimmed and
/// case-folded before the partial scorer compares them, and the first
/// category wins when scores tie.
///
/// # Examples
/// ```
/// use pazar_core::Category;
/// use pazar_ranker::CategoryMatcher;
///
/// let categories = [
///     Category { id: 1, name: "Бял хляб от 500 гр. до 1 кг".into() },
///     Category { id: 38, name: "Бяла захар 1 кг".into() },
/// ];
/// let matcher = CategoryMatcher::new(&categories);
/// assert_eq!(matcher.resolve("  Захар ").map(|found| found.category_id), Some(38));
/// assert!(matcher.resolve("фотоапарат").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CategoryMatcher {
    category_ids: Vec<u32>,
    names: Vec<String>,
    threshold: f64,
}

impl CategoryMatcher {
    /// Build a matcher over `categories` in the given order.
    pub fn new<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a Category>,
    {
        let (category_ids, names) = categories
            .into_iter()
            .map(|category| (category.id, category.name.to_lowercase()))
            .unzip();
        Self {
            category_ids,
            names,
            threshold: CATEGORY_MATCH_THRESHOLD,
        }
    }

    /// Override the acceptance threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Find the category closest to `term`, if it scores at least the
    /// threshold.
    #[must_use]
    pub fn resolve(&self, term: &str) -> Option<CategoryMatch> {
        let query = term.trim().to_lowercase();
        let found = best_match(&query, &self.names, &PartialScorer)?;
        if found.score < self.threshold {
            debug!("term '{query}' is uncategorized (best score {:.1})", found.score);
            return None;
        }
        let category_id = *self.category_ids.get(found.index)?;
        Some(CategoryMatch {
            category_id,
            score: found.score,
        })
    }
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests should fail fast")]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn categories() -> Vec<Category> {
        [
            (1, "Бял хляб от 500 гр. до 1 кг"),
            (6, "Прясно мляко от 2 % до 3.6 % 1 л"),
            (12, "Краве масло от 125 гр. до 250 гр."),
            (38, "Бяла захар 1 кг"),
        ]
        .into_iter()
        .map(|(id, name)| Category {
            id,
            name: name.to_owned(),
        })
        .collect()
    }

    #[rstest]
    #[case("хляб", 1)]
    #[case("МЛЯКО", 6)]
    #[case(" масло ", 12)]
    #[case("захар", 38)]
    fn resolves_terms_to_categories(
        categories: Vec<Category>,
        #[case] term: &str,
        #[case] expected: u32,
    ) {
        let found = CategoryMatcher::new(&categories)
            .resolve(term)
            .expect("term should resolve");
        assert_eq!(found.category_id, expected);
        assert_eq!(found.score, 100.0);
    }

    #[rstest]
    fn misspelled_term_still_resolves(categories: Vec<Category>) {
        let found = CategoryMatcher::new(&categories)
            .resolve("захра")
            .expect("close spelling passes the threshold");
        assert_eq!(found.category_id, 38);
        assert!((CATEGORY_MATCH_THRESHOLD..100.0).contains(&found.score));
    }

    #[rstest]
    #[case("")]
    #[case("qwerty")]
    fn unrelated_terms_are_uncategorized(categories: Vec<Category>, #[case] term: &str) {
        assert_eq!(CategoryMatcher::new(&categories).resolve(term), None);
    }

    #[rstest]
    fn threshold_is_inclusive(categories: Vec<Category>) {
        let matcher = CategoryMatcher::new(&categories);
        let score = matcher
            .with_threshold(0.0)
            .resolve("хлеб")
            .expect("any score passes a zero threshold")
            .score;
        let at_threshold = CategoryMatcher::new(&categories).with_threshold(score);
        assert!(at_threshold.resolve("хлеб").is_some());
        let above = CategoryMatcher::new(&categories).with_threshold(score.next_up());
        assert!(above.resolve("хлеб").is_none());
    }

    #[rstest]
    fn ties_keep_the_first_category() {
        let twins = [
            Category { id: 4, name: "Ориз".to_owned() },
            Category { id: 5, name: "ориз".to_owned() },
        ];
        let found = CategoryMatcher::new(&twins).resolve("ориз").expect("match");
        assert_eq!(found.category_id, 4);
    }

    #[rstest]
    fn empty_taxonomy_resolves_nothing() {
        let none: [Category; 0] = [];
        assert_eq!(CategoryMatcher::new(&none).resolve("хляб"), None);
    }
}
