//! Request-time store ranking.
//!
//! Every call reads the repository once, builds a per-store category index of
//! the inventory, and prices the shopping list at each store. Nothing is
//! cached between calls, so one engine can serve concurrent requests as long
//! as the repository reads are consistent.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use geo::Coord;
use log::{debug, warn};
use pazar_core::{
    Category, Product, ProductFilter, Repository, Store, format_coordinates, haversine_km,
    parse_coordinates,
};

use crate::category::CategoryMatcher;
use crate::entry::{ChosenItem, RankingEntry, UNKNOWN_CHAIN, round_cents};
use crate::{RankingConfig, RankingError};

/// A shopping-list term with its resolved category, if any.
#[derive(Debug)]
struct Term<'a> {
    text: &'a str,
    category_id: Option<u32>,
}

/// Products of one store grouped by category, in repository order.
type Shelf = HashMap<u32, Vec<Product>>;

/// Running totals for one store.
#[derive(Debug, Default)]
struct Basket {
    chosen: Vec<ChosenItem>,
    missing: Vec<String>,
    real: f64,
    penalty: f64,
}

/// Ranks stores by the estimated total cost of a shopping list.
///
/// A store's score is the sum of the cheapest matching products it stocks,
/// a penalty for every term it cannot satisfy, and a travel cost
/// proportional to its distance from the user.
///
/// # Examples
/// ```
/// use pazar_core::test_support::MemoryRepository;
/// use pazar_core::{NewProduct, Repository, parse_coordinates};
/// use pazar_ranker::RankingEngine;
///
/// let here = parse_coordinates("43.2047, 27.9100")?;
/// let mut repository = MemoryRepository::default()
///     .with_category(38, "Бяла захар 1 кг")
///     .with_chain(1, "Kaufland")
///     .with_store(7, Some(1), "ул. „Девня“ 24", Some(here));
/// repository.insert_product(&NewProduct::new(7, Some(38), None, "Захар", None, 2.2)?)?;
///
/// let ranking = RankingEngine::default().rank(&repository, &["захар"], "43.2047, 27.9100")?;
/// assert_eq!(ranking[0].chain_name, "Kaufland");
/// assert_eq!(ranking[0].internal_score, 2.2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    config: RankingConfig,
}

impl RankingEngine {
    /// Build an engine with validated settings.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] when a setting is unusable.
    pub fn new(config: RankingConfig) -> Result<Self, RankingError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank stores for `terms` as seen from a `"lat, lon"` position.
    ///
    /// A malformed position is not an error: every store is then charged the
    /// penalty distance.
    ///
    /// # Errors
    /// Returns [`RankingError::Query`] when the repository cannot be read.
    pub fn rank<R, S>(
        &self,
        repository: &R,
        terms: &[S],
        user_coords: &str,
    ) -> Result<Vec<RankingEntry>, RankingError>
    where
        R: Repository + ?Sized,
        S: AsRef<str>,
    {
        let user = parse_coordinates(user_coords)
            .inspect_err(|error| warn!("ignoring user position: {error}"))
            .ok();
        self.rank_at(repository, terms, user)
    }

    /// Rank stores for `terms` as seen from an optional position.
    ///
    /// Stores are returned cheapest first. Stores that satisfy none of the
    /// terms are left out; equal scores keep store enumeration order.
    ///
    /// # Errors
    /// Returns [`RankingError::Query`] when the repository cannot be read.
    pub fn rank_at<R, S>(
        &self,
        repository: &R,
        terms: &[S],
        user: Option<Coord<f64>>,
    ) -> Result<Vec<RankingEntry>, RankingError>
    where
        R: Repository + ?Sized,
        S: AsRef<str>,
    {
        let categories = query("categories", repository.categories())?;
        let resolved = self.resolve_terms(&categories, terms);
        let averages = query("market averages", repository.average_price_by_category())?;
        let chains: HashMap<u32, String> = query("chains", repository.chains())?
            .into_iter()
            .map(|chain| (chain.id, chain.name))
            .collect();
        let shelves = index_inventory(query(
            "products",
            repository.products(ProductFilter::all()),
        )?);
        let stores = query("stores", repository.stores(None))?;

        let mut entries = Vec::new();
        for store in &stores {
            let Some(shelf) = shelves.get(&store.id) else {
                continue;
            };
            let basket = self.fill_basket(shelf, &resolved, &averages);
            if basket.chosen.is_empty() {
                debug!("store {} offers nothing on the list", store.id);
                continue;
            }
            let distance = self.distance_to(user, store);
            entries.push(self.entry(store, &chains, basket, distance));
        }
        entries.sort_by(|left, right| left.internal_score.total_cmp(&right.internal_score));
        debug!(
            "ranked {} of {} stores for {} term(s)",
            entries.len(),
            stores.len(),
            resolved.len()
        );
        Ok(entries)
    }

    fn resolve_terms<'t, S: AsRef<str>>(
        &self,
        categories: &[Category],
        terms: &'t [S],
    ) -> Vec<Term<'t>> {
        let matcher =
            CategoryMatcher::new(categories).with_threshold(self.config.category_threshold);
        terms
            .iter()
            .map(|term| Term {
                text: term.as_ref(),
                category_id: matcher
                    .resolve(term.as_ref())
                    .map(|found| found.category_id),
            })
            .collect()
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "basket totals accumulate prices and penalties"
    )]
    fn fill_basket(
        &self,
        shelf: &Shelf,
        terms: &[Term<'_>],
        averages: &HashMap<u32, f64>,
    ) -> Basket {
        let mut basket = Basket::default();
        for term in terms {
            let Some(category_id) = term.category_id else {
                basket.penalty += self.config.uncategorized_penalty;
                basket.missing.push(term.text.to_owned());
                continue;
            };
            let Some(product) = shelf.get(&category_id).and_then(|products| cheapest(products))
            else {
                basket.penalty += averages
                    .get(&category_id)
                    .copied()
                    .unwrap_or(self.config.default_missing_cost);
                basket.missing.push(term.text.to_owned());
                continue;
            };
            basket.real += product.price;
            basket.chosen.push(ChosenItem {
                requested_as: term.text.to_owned(),
                name: product.name.clone(),
                price: round_cents(product.price),
            });
        }
        basket
    }

    fn distance_to(&self, user: Option<Coord<f64>>, store: &Store) -> f64 {
        match (user, store.location) {
            (Some(from), Some(to)) => haversine_km(from, to),
            _ => self.config.penalty_distance_km,
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "the score adds basket, penalty and travel cost"
    )]
    fn entry(
        &self,
        store: &Store,
        chains: &HashMap<u32, String>,
        basket: Basket,
        distance: f64,
    ) -> RankingEntry {
        let chain_name = store
            .chain_id
            .and_then(|id| chains.get(&id))
            .map_or_else(|| UNKNOWN_CHAIN.to_owned(), Clone::clone);
        let internal_score = basket.real + basket.penalty + distance * self.config.cost_per_km;
        RankingEntry {
            store_id: store.id,
            chain_name,
            address: store.address.clone(),
            coords: store.location.map(format_coordinates),
            missing_count: basket.missing.len(),
            chosen_items: basket.chosen,
            missing_items: basket.missing,
            real_price: round_cents(basket.real),
            distance_km: round_cents(distance),
            internal_score,
        }
    }
}

fn query<T>(
    operation: &'static str,
    result: Result<T, pazar_core::RepositoryError>,
) -> Result<T, RankingError> {
    result.map_err(|source| RankingError::Query { operation, source })
}

/// Group products by store and category, dropping uncategorised ones.
fn index_inventory(products: Vec<Product>) -> HashMap<u32, Shelf> {
    let mut shelves: HashMap<u32, Shelf> = HashMap::new();
    for product in products {
        let shelf = shelves.entry(product.store_id).or_default();
        if let Some(category_id) = product.category_id {
            shelf.entry(category_id).or_default().push(product);
        }
    }
    shelves
}

/// The product with the lowest unit price; the earliest wins ties.
fn cheapest(products: &[Product]) -> Option<&Product> {
    products.iter().reduce(|best, candidate| {
        if candidate.comparable_price() < best.comparable_price() {
            candidate
        } else {
            best
        }
    })
}
