//! Repository access for reference records and price observations.
//!
//! [`Repository`] is the persistence seam of the crate. Readers (catalog
//! loading, ranking) use the `&self` methods; feed importers append products
//! through the `&mut self` methods on a session they own exclusively.

use std::collections::HashMap;

use thiserror::Error;

use crate::{Category, Chain, ChainAlias, NewProduct, Product, Store, UnitRecord};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteRepository;

/// Errors raised by [`Repository`] implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic SQLite error.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    /// A product referenced a store that does not exist.
    #[error("store {store_id} does not exist")]
    UnknownStore {
        /// Missing store identifier.
        store_id: u32,
    },
    /// A product referenced a category that does not exist.
    #[error("category {category_id} does not exist")]
    UnknownCategory {
        /// Missing category identifier.
        category_id: u32,
    },
    /// A persisted row could not be converted into a domain value.
    #[error("invalid {table} row {id}: {reason}")]
    InvalidRecord {
        /// Table the row was read from.
        table: &'static str,
        /// Row identifier.
        id: i64,
        /// Description of the problem.
        reason: String,
    },
}

/// Restricts [`Repository::products`] to one store and/or category.
///
/// # Examples
/// ```
/// use pazar_core::ProductFilter;
///
/// let filter = ProductFilter::all().store(3).category(38);
/// assert_eq!(filter.store_id, Some(3));
/// assert_eq!(filter.category_id, Some(38));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProductFilter {
    /// Only products offered by this store.
    pub store_id: Option<u32>,
    /// Only products in this category.
    pub category_id: Option<u32>,
}

impl ProductFilter {
    /// A filter matching every product.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            store_id: None,
            category_id: None,
        }
    }

    /// Restrict to `store_id`.
    #[must_use]
    pub const fn store(mut self, store_id: u32) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Restrict to `category_id`.
    #[must_use]
    pub const fn category(mut self, category_id: u32) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Whether `product` passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.store_id.is_none_or(|id| product.store_id == id)
            && self
                .category_id
                .is_none_or(|id| product.category_id == Some(id))
    }
}

/// Queryable persistence for stores, taxonomies and products.
///
/// Listing methods return rows in identifier order so callers observe a
/// stable enumeration.
pub trait Repository {
    /// List stores, optionally only those of `chain_id`.
    fn stores(&self, chain_id: Option<u32>) -> Result<Vec<Store>, RepositoryError>;

    /// List chains.
    fn chains(&self) -> Result<Vec<Chain>, RepositoryError>;

    /// List chain aliases in insertion order.
    fn chain_aliases(&self) -> Result<Vec<ChainAlias>, RepositoryError>;

    /// List categories.
    fn categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// List canonical units.
    fn units(&self) -> Result<Vec<UnitRecord>, RepositoryError>;

    /// List products passing `filter`.
    fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Mean price per category over every product that has one.
    fn average_price_by_category(&self) -> Result<HashMap<u32, f64>, RepositoryError>;

    /// Persist one product and return its identifier.
    fn insert_product(&mut self, product: &NewProduct) -> Result<u64, RepositoryError>;

    /// Persist a batch of products and return their identifiers in order.
    ///
    /// Implementations backed by transactional storage should write the
    /// batch atomically.
    fn insert_products(&mut self, products: &[NewProduct]) -> Result<Vec<u64>, RepositoryError> {
        products
            .iter()
            .map(|product| self.insert_product(product))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryRepository;
    use crate::{NewProduct, Unit};
    use rstest::{fixture, rstest};

    fn product(store_id: u32, category_id: Option<u32>, price: f64) -> NewProduct {
        NewProduct::new(store_id, category_id, Some(Unit::Item), "x", None, price)
            .expect("valid product")
    }

    #[fixture]
    fn repository() -> MemoryRepository {
        let mut repository = MemoryRepository::default()
            .with_category(1, "Бял хляб")
            .with_category(6, "Прясно мляко")
            .with_store(1, None, "девня 24", None)
            .with_store(2, None, "мир 45", None);
        repository
            .insert_products(&[
                product(1, Some(1), 1.0),
                product(1, Some(6), 2.0),
                product(2, Some(1), 2.0),
                product(2, None, 9.0),
            ])
            .expect("insert products");
        repository
    }

    #[rstest]
    #[case(ProductFilter::all(), 4)]
    #[case(ProductFilter::all().store(1), 2)]
    #[case(ProductFilter::all().category(1), 2)]
    #[case(ProductFilter::all().store(2).category(6), 0)]
    fn filters_products(
        repository: MemoryRepository,
        #[case] filter: ProductFilter,
        #[case] expected: usize,
    ) {
        let found = repository.products(filter).expect("list products");
        assert_eq!(found.len(), expected);
        assert!(found.iter().all(|product| filter.matches(product)));
    }

    #[rstest]
    fn averages_ignore_uncategorised_products(repository: MemoryRepository) {
        let averages = repository.average_price_by_category().expect("averages");
        assert_eq!(averages.len(), 2);
        assert!((averages[&1] - 1.5).abs() < 1e-9);
        assert!((averages[&6] - 2.0).abs() < 1e-9);
    }

    #[rstest]
    fn insert_assigns_increasing_ids(mut repository: MemoryRepository) {
        let ids = repository
            .insert_products(&[product(1, None, 1.0), product(2, None, 1.0)])
            .expect("insert");
        assert_eq!(ids, vec![5, 6]);
    }

    #[rstest]
    fn insert_rejects_unknown_store(mut repository: MemoryRepository) {
        let err = repository
            .insert_product(&product(99, None, 1.0))
            .expect_err("unknown store");
        assert!(matches!(err, RepositoryError::UnknownStore { store_id: 99 }));
    }
}
