//! Immutable lookup tables for the reference taxonomies.
//!
//! A [`Catalog`] is loaded once, validated, and then shared read-only by
//! importers and ranking requests. Records are kept in arenas in load order
//! with identifier indexes alongside.

use std::collections::HashMap;

use thiserror::Error;

use crate::{Category, Chain, ChainAlias, Repository, RepositoryError, Store, Unit, UnitRecord};

/// Errors returned while building a [`Catalog`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Loading records from the repository failed.
    #[error("failed to load catalog records: {0}")]
    Repository(#[from] RepositoryError),
    /// Two records of the same kind shared an identifier.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Record kind, e.g. `"category"`.
        kind: &'static str,
        /// Repeated identifier.
        id: u32,
    },
    /// An alias pointed at a chain that does not exist.
    #[error("alias '{alias}' references unknown chain {chain_id}")]
    UnknownAliasChain {
        /// Offending alias.
        alias: String,
        /// Missing chain identifier.
        chain_id: u32,
    },
    /// A store pointed at a chain that does not exist.
    #[error("store {store_id} references unknown chain {chain_id}")]
    UnknownStoreChain {
        /// Offending store.
        store_id: u32,
        /// Missing chain identifier.
        chain_id: u32,
    },
}

/// Raw record lists a [`Catalog`] is built from.
#[derive(Debug, Default, Clone)]
pub struct CatalogRecords {
    /// Product taxonomy.
    pub categories: Vec<Category>,
    /// Retail brands.
    pub chains: Vec<Chain>,
    /// Alternative chain spellings, in match priority order.
    pub aliases: Vec<ChainAlias>,
    /// Known shops.
    pub stores: Vec<Store>,
    /// Canonical units with their persisted identifiers.
    pub units: Vec<UnitRecord>,
}

/// Validated, read-only reference data.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: u64,
    records: CatalogRecords,
    category_index: HashMap<u32, usize>,
    chain_index: HashMap<u32, usize>,
    store_index: HashMap<u32, usize>,
}

fn index_ids(
    kind: &'static str,
    ids: impl Iterator<Item = u32>,
) -> Result<HashMap<u32, usize>, CatalogError> {
    let mut index = HashMap::new();
    for (position, id) in ids.enumerate() {
        if index.insert(id, position).is_some() {
            return Err(CatalogError::DuplicateId { kind, id });
        }
    }
    Ok(index)
}

impl Catalog {
    /// Validate `records` and build the lookup indexes.
    ///
    /// # Errors
    /// Returns [`CatalogError`] when identifiers repeat or when an alias or
    /// store references a missing chain.
    ///
    /// # Examples
    /// ```
    /// use pazar_core::{Catalog, CatalogRecords, Chain, ChainAlias};
    ///
    /// let catalog = Catalog::new(1, CatalogRecords {
    ///     chains: vec![Chain { id: 1, name: "Lidl".into() }],
    ///     aliases: vec![ChainAlias { alias: "lidl".into(), chain_id: 1 }],
    ///     ..CatalogRecords::default()
    /// })?;
    /// let chain = catalog.chain_for_filename("LIDL_2024-05-01.csv").unwrap();
    /// assert_eq!(chain.name, "Lidl");
    /// # Ok::<(), pazar_core::CatalogError>(())
    /// ```
    pub fn new(version: u64, records: CatalogRecords) -> Result<Self, CatalogError> {
        let category_index = index_ids("category", records.categories.iter().map(|c| c.id))?;
        let chain_index = index_ids("chain", records.chains.iter().map(|c| c.id))?;
        let store_index = index_ids("store", records.stores.iter().map(|s| s.id))?;
        index_ids("unit", records.units.iter().map(|u| u.id))?;

        if let Some(alias) = records
            .aliases
            .iter()
            .find(|alias| !chain_index.contains_key(&alias.chain_id))
        {
            return Err(CatalogError::UnknownAliasChain {
                alias: alias.alias.clone(),
                chain_id: alias.chain_id,
            });
        }
        for store in &records.stores {
            if let Some(chain_id) = store.chain_id
                && !chain_index.contains_key(&chain_id)
            {
                return Err(CatalogError::UnknownStoreChain {
                    store_id: store.id,
                    chain_id,
                });
            }
        }

        Ok(Self {
            version,
            records,
            category_index,
            chain_index,
            store_index,
        })
    }

    /// Read every reference table from `repository`.
    ///
    /// # Errors
    /// Returns [`CatalogError`] when a query fails or the records are
    /// inconsistent.
    pub fn load<R: Repository + ?Sized>(
        repository: &R,
        version: u64,
    ) -> Result<Self, CatalogError> {
        let records = CatalogRecords {
            categories: repository.categories()?,
            chains: repository.chains()?,
            aliases: repository.chain_aliases()?,
            stores: repository.stores(None)?,
            units: repository.units()?,
        };
        Self::new(version, records)
    }

    /// Version number supplied at load time.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Categories in load order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.records.categories
    }

    /// Chains in load order.
    #[must_use]
    pub fn chains(&self) -> &[Chain] {
        &self.records.chains
    }

    /// Stores in load order.
    #[must_use]
    pub fn stores(&self) -> &[Store] {
        &self.records.stores
    }

    /// Look up a category.
    #[must_use]
    pub fn category(&self, id: u32) -> Option<&Category> {
        self.category_index
            .get(&id)
            .and_then(|&i| self.records.categories.get(i))
    }

    /// Look up a chain.
    #[must_use]
    pub fn chain(&self, id: u32) -> Option<&Chain> {
        self.chain_index
            .get(&id)
            .and_then(|&i| self.records.chains.get(i))
    }

    /// Look up a store.
    #[must_use]
    pub fn store(&self, id: u32) -> Option<&Store> {
        self.store_index
            .get(&id)
            .and_then(|&i| self.records.stores.get(i))
    }

    /// Name of the chain owning `store`, if any.
    #[must_use]
    pub fn chain_name(&self, store: &Store) -> Option<&str> {
        store
            .chain_id
            .and_then(|id| self.chain(id))
            .map(|chain| chain.name.as_str())
    }

    /// Identify the chain whose alias occurs in `filename`.
    ///
    /// Matching is a case-insensitive substring test; the first alias in
    /// load order wins.
    #[must_use]
    pub fn chain_for_filename(&self, filename: &str) -> Option<&Chain> {
        let filename = filename.to_lowercase();
        self.records
            .aliases
            .iter()
            .find(|alias| {
                let alias = alias.alias.trim().to_lowercase();
                !alias.is_empty() && filename.contains(&alias)
            })
            .and_then(|alias| self.chain(alias.chain_id))
    }

    /// Aliases of `chain_id` in load order.
    pub fn aliases_of(&self, chain_id: u32) -> impl Iterator<Item = &str> + '_ {
        self.records
            .aliases
            .iter()
            .filter(move |alias| alias.chain_id == chain_id)
            .map(|alias| alias.alias.as_str())
    }

    /// Stores of `chain_id` in load order.
    pub fn stores_of(&self, chain_id: u32) -> impl Iterator<Item = &Store> + '_ {
        self.records
            .stores
            .iter()
            .filter(move |store| store.chain_id == Some(chain_id))
    }

    /// Persisted identifier of `unit`.
    #[must_use]
    pub fn unit_id(&self, unit: Unit) -> Option<u32> {
        self.records
            .units
            .iter()
            .find(|record| record.unit == unit)
            .map(|record| record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryRepository;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repository() -> MemoryRepository {
        MemoryRepository::default()
            .with_category(38, "Бяла захар 1 кг")
            .with_chain(1, "Lidl")
            .with_alias("лидл", 1)
            .with_chain(2, "Kaufland")
            .with_alias("кауфланд", 2)
            .with_store(10, Some(1), "ул. „Мир“ 45", None)
            .with_store(11, Some(2), "ул. „Девня“ 24", None)
            .with_store(12, Some(2), "бул. „Република“ 60", None)
            .with_store(13, None, "пазар", None)
    }

    #[fixture]
    fn catalog(repository: MemoryRepository) -> Catalog {
        Catalog::load(&repository, 7).expect("load catalog")
    }

    #[rstest]
    #[case("Lidl_prices.csv", Some("Lidl"))]
    #[case("ЦЕНИ КАУФЛАНД.csv", Some("Kaufland"))]
    #[case("kaufland-varna.CSV", Some("Kaufland"))]
    #[case("billa.csv", None)]
    fn identifies_chain_from_filename(
        catalog: Catalog,
        #[case] filename: &str,
        #[case] expected: Option<&str>,
    ) {
        let found = catalog.chain_for_filename(filename).map(|c| c.name.as_str());
        assert_eq!(found, expected);
    }

    #[rstest]
    fn lists_stores_and_aliases_per_chain(catalog: Catalog) {
        let ids: Vec<u32> = catalog.stores_of(2).map(|s| s.id).collect();
        assert_eq!(ids, vec![11, 12]);
        let aliases: Vec<&str> = catalog.aliases_of(2).collect();
        assert_eq!(aliases, vec!["kaufland", "кауфланд"]);
    }

    #[rstest]
    fn resolves_records_by_id(catalog: Catalog) {
        assert_eq!(catalog.version(), 7);
        assert_eq!(catalog.category(38).map(|c| c.id), Some(38));
        assert!(catalog.category(1).is_none());
        let store = catalog.store(13).expect("store 13");
        assert_eq!(catalog.chain_name(store), None);
        let store = catalog.store(10).expect("store 10");
        assert_eq!(catalog.chain_name(store), Some("Lidl"));
        assert_eq!(catalog.unit_id(Unit::Litre), Some(2));
    }

    #[rstest]
    fn rejects_duplicate_ids() {
        let repository = MemoryRepository::default()
            .with_category(1, "a")
            .with_category(1, "b");
        let err = Catalog::load(&repository, 1).expect_err("duplicate");
        assert!(matches!(
            err,
            CatalogError::DuplicateId { kind: "category", id: 1 }
        ));
    }

    #[rstest]
    fn rejects_dangling_alias() {
        let repository = MemoryRepository::default().with_alias("metro", 4);
        let err = Catalog::load(&repository, 1).expect_err("dangling alias");
        assert!(matches!(err, CatalogError::UnknownAliasChain { chain_id: 4, .. }));
    }

    #[rstest]
    fn rejects_store_of_unknown_chain() {
        let repository = MemoryRepository::default().with_store(1, Some(3), "x", None);
        let err = Catalog::load(&repository, 1).expect_err("dangling store");
        assert!(matches!(
            err,
            CatalogError::UnknownStoreChain { store_id: 1, chain_id: 3 }
        ));
    }
}
