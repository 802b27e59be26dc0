//! Match free-text feed addresses to known stores.
//!
//! Feed rows spell store addresses inconsistently: `"Kaufland 4 ул. Девня 24"`
//! in a feed versus `ул. „Девня“ 24` in the store list. Both sides are passed
//! through [`normalize_address`] and the chain's own names are removed before
//! the token-set scorer compares them.

use log::debug;

use crate::Store;
use crate::matching::{TokenSetScorer, best_match};

/// A store is accepted only when its score exceeds this value.
pub const ADDRESS_MATCH_THRESHOLD: f64 = 80.0;

/// Decorative glyphs and venue qualifiers removed before prefixes.
const NOISE: [&str; 8] = [
    "„",
    "“",
    "\"",
    "(",
    ")",
    " - ет. -2",
    ", grand mall, ет. -2",
    ", uptown ниво 1",
];

/// Street, city and label prefixes removed wherever they occur.
///
/// `бул.` precedes `ул.` so boulevards are not left as a stray `б`.
const PREFIXES: [&str; 7] = ["бул.", "ул.", "гр.", "к.к.", "адрес:", "bulmag", "булмаг"];

/// Lowercase an address and strip quotes, venue qualifiers and prefixes.
///
/// Whitespace runs collapse to single spaces.
///
/// # Examples
/// ```
/// use pazar_core::normalize_address;
///
/// assert_eq!(normalize_address("ул. „Девня“ 24"), "девня 24");
/// assert_eq!(
///     normalize_address("ул. „Академик Андрей Сахаров“ 2, Grand Mall, ет. -2"),
///     "академик андрей сахаров 2",
/// );
/// ```
#[must_use]
pub fn normalize_address(raw: &str) -> String {
    let mut address = raw.to_lowercase();
    for noise in NOISE.iter().chain(PREFIXES.iter()) {
        address = address.replace(noise, "");
    }
    address.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A store selected by [`AddressResolver::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressMatch {
    /// Identifier of the matched store.
    pub store_id: u32,
    /// Token-set similarity of the match.
    pub score: f64,
}

/// Resolves feed addresses against the stores of one chain.
///
/// Store addresses are normalised once at construction, so a resolver is
/// built per feed file and reused for every row.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    store_ids: Vec<u32>,
    addresses: Vec<String>,
    aliases: Vec<String>,
    threshold: f64,
}

impl AddressResolver {
    /// Build a resolver over `stores`, removing `aliases` from both sides.
    ///
    /// # Examples
    /// ```
    /// use pazar_core::{AddressResolver, Store};
    ///
    /// let store = Store {
    ///     id: 9,
    ///     chain_id: Some(2),
    ///     address: "ул. „Девня“ 24".into(),
    ///     populated_area: Some("Варна".into()),
    ///     location: None,
    /// };
    /// let resolver = AddressResolver::new([&store], ["kaufland", "кауфланд"]);
    /// let found = resolver.resolve("Kaufland 4 ул. Девня 24").unwrap();
    /// assert_eq!(found.store_id, 9);
    /// assert!(resolver.resolve("бул. Сливница 185").is_none());
    /// ```
    pub fn new<'a, S, A>(stores: S, aliases: A) -> Self
    where
        S: IntoIterator<Item = &'a Store>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        let aliases: Vec<String> = aliases
            .into_iter()
            .map(|alias| alias.as_ref().trim().to_lowercase())
            .filter(|alias| !alias.is_empty())
            .collect();
        let (store_ids, addresses): (Vec<u32>, Vec<String>) = stores
            .into_iter()
            .map(|store| (store.id, strip_aliases(&normalize_address(&store.address), &aliases)))
            .unzip();
        Self {
            store_ids,
            addresses,
            aliases,
            threshold: ADDRESS_MATCH_THRESHOLD,
        }
    }

    /// Override the acceptance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Number of candidate stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store_ids.len()
    }

    /// Whether the resolver has no candidate stores.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store_ids.is_empty()
    }

    /// Find the store whose address best matches `raw`.
    ///
    /// Returns `None` unless the best score is strictly above the threshold.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<AddressMatch> {
        let query = strip_aliases(&normalize_address(raw), &self.aliases);
        let found = best_match(&query, &self.addresses, &TokenSetScorer)?;
        if found.score <= self.threshold {
            debug!(
                "address '{raw}' best score {:.1} is below {:.1}",
                found.score, self.threshold
            );
            return None;
        }
        let store_id = *self.store_ids.get(found.index)?;
        Some(AddressMatch {
            store_id,
            score: found.score,
        })
    }
}

/// Remove chain names from an address.
///
/// A token equal to an alias is dropped. A token that starts with an alias
/// followed by a non-letter, such as `kaufland4`, keeps only that suffix.
fn strip_aliases(address: &str, aliases: &[String]) -> String {
    address
        .split_whitespace()
        .filter_map(|token| {
            let rest = aliases
                .iter()
                .filter_map(|alias| token.strip_prefix(alias.as_str()))
                .find(|rest| !rest.starts_with(char::is_alphabetic))
                .unwrap_or(token);
            (!rest.is_empty()).then_some(rest)
        })
        .collect::<Vec<_>>()
        .join(" ")
}
