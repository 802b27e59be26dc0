//! Test-only, in-memory collaborators used by unit and behaviour tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use geo::Coord;

use crate::{
    Category, Chain, ChainAlias, GeocodeError, Geocoder, NewProduct, Product, ProductFilter,
    Repository, RepositoryError, Store, Unit, UnitRecord,
};

/// In-memory [`Repository`] used in tests.
///
/// Every query is a linear scan, so it suits small fixtures only. Units are
/// pre-populated with identifiers `1..=3` in [`Unit::ALL`] order.
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    categories: Vec<Category>,
    chains: Vec<Chain>,
    aliases: Vec<ChainAlias>,
    stores: Vec<Store>,
    units: Vec<UnitRecord>,
    products: Vec<Product>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            chains: Vec::new(),
            aliases: Vec::new(),
            stores: Vec::new(),
            units: Unit::ALL
                .iter()
                .zip(1..)
                .map(|(unit, id)| UnitRecord { id, unit: *unit })
                .collect(),
            products: Vec::new(),
        }
    }
}

impl MemoryRepository {
    /// Add a category.
    #[must_use]
    pub fn with_category(mut self, id: u32, name: &str) -> Self {
        self.categories.push(Category {
            id,
            name: name.to_owned(),
        });
        self
    }

    /// Add a chain together with its lowercased name as an alias.
    #[must_use]
    pub fn with_chain(mut self, id: u32, name: &str) -> Self {
        self.chains.push(Chain {
            id,
            name: name.to_owned(),
        });
        self.with_alias(&name.to_lowercase(), id)
    }

    /// Add an extra alias for `chain_id`.
    #[must_use]
    pub fn with_alias(mut self, alias: &str, chain_id: u32) -> Self {
        self.aliases.push(ChainAlias {
            alias: alias.to_owned(),
            chain_id,
        });
        self
    }

    /// Add a store.
    #[must_use]
    pub fn with_store(
        mut self,
        id: u32,
        chain_id: Option<u32>,
        address: &str,
        location: Option<Coord<f64>>,
    ) -> Self {
        self.stores.push(Store {
            id,
            chain_id,
            address: address.to_owned(),
            populated_area: None,
            location,
        });
        self
    }

    /// All persisted products in insertion order.
    #[must_use]
    pub fn all_products(&self) -> &[Product] {
        &self.products
    }
}

impl Repository for MemoryRepository {
    fn stores(&self, chain_id: Option<u32>) -> Result<Vec<Store>, RepositoryError> {
        Ok(self
            .stores
            .iter()
            .filter(|store| chain_id.is_none_or(|id| store.chain_id == Some(id)))
            .cloned()
            .collect())
    }

    fn chains(&self) -> Result<Vec<Chain>, RepositoryError> {
        Ok(self.chains.clone())
    }

    fn chain_aliases(&self) -> Result<Vec<ChainAlias>, RepositoryError> {
        Ok(self.aliases.clone())
    }

    fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(self.categories.clone())
    }

    fn units(&self) -> Result<Vec<UnitRecord>, RepositoryError> {
        Ok(self.units.clone())
    }

    fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .products
            .iter()
            .filter(|product| filter.matches(product))
            .cloned()
            .collect())
    }

    fn average_price_by_category(&self) -> Result<HashMap<u32, f64>, RepositoryError> {
        let mut totals: HashMap<u32, (f64, u32)> = HashMap::new();
        for product in &self.products {
            if let Some(category_id) = product.category_id {
                let entry = totals.entry(category_id).or_insert((0.0, 0));
                entry.0 += product.price;
                entry.1 += 1;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(id, (sum, count))| (id, sum / f64::from(count)))
            .collect())
    }

    fn insert_product(&mut self, product: &NewProduct) -> Result<u64, RepositoryError> {
        if !self.stores.iter().any(|store| store.id == product.store_id) {
            return Err(RepositoryError::UnknownStore {
                store_id: product.store_id,
            });
        }
        if let Some(category_id) = product.category_id
            && !self.categories.iter().any(|category| category.id == category_id)
        {
            return Err(RepositoryError::UnknownCategory { category_id });
        }
        let id = self.products.len() as u64 + 1;
        self.products.push(product.clone().with_id(id));
        Ok(id)
    }
}

/// Deterministic [`Geocoder`] answering from a fixed table.
///
/// Lookups are case- and whitespace-insensitive. Every call is counted so
/// tests can assert on caching behaviour.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    answers: HashMap<String, Coord<f64>>,
    failure: Option<GeocodeError>,
    calls: AtomicUsize,
}

fn lookup_key(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl StaticGeocoder {
    /// Register the coordinate returned for `address`.
    #[must_use]
    pub fn with(mut self, address: &str, coord: Coord<f64>) -> Self {
        self.answers.insert(lookup_key(address), coord);
        self
    }

    /// A geocoder that fails every call with `error`.
    #[must_use]
    pub fn failing(error: GeocodeError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        Ok(self.answers.get(&lookup_key(address)).copied())
    }
}
