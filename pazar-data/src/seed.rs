//! Load reference data from JSON seed files.
//!
//! A seed lists categories with their fixed ids, chains with the aliases
//! used to recognise them, and known stores. Applying a seed twice leaves
//! the database unchanged: categories are keyed by id, chains and aliases
//! by name, stores by chain and address.

use camino::{Utf8Path, Utf8PathBuf};
use log::{info, warn};
use pazar_core::{
    Category, CoordinatesError, Geocoder, Repository, RepositoryError, SqliteRepository,
    parse_coordinates,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while reading or applying a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The seed file could not be read.
    #[error("failed to read seed file at {path}")]
    Read {
        /// Location of the seed file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The seed is not valid JSON of the expected shape.
    #[error("failed to parse seed data")]
    Parse {
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A store names a chain the seed does not define.
    #[error("store '{address}' references unknown chain '{chain}'")]
    UnknownChain {
        /// Store address.
        address: String,
        /// Missing chain name.
        chain: String,
    },
    /// A store's coordinates could not be parsed.
    #[error("store '{address}' has invalid coordinates")]
    Coordinates {
        /// Store address.
        address: String,
        /// Parse error.
        #[source]
        source: CoordinatesError,
    },
    /// Writing to the repository failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A category with its externally assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCategory {
    /// Fixed identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
}

/// A chain and its alternative spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedChain {
    /// Canonical chain name.
    pub name: String,
    /// Case-insensitive spellings found in file names and addresses.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A known store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedStore {
    /// Name of the owning chain, if any.
    #[serde(default)]
    pub chain: Option<String>,
    /// Street address.
    pub address: String,
    /// Town or village.
    #[serde(default)]
    pub populated_area: Option<String>,
    /// Position as `"lat, lon"`.
    #[serde(default)]
    pub coords: Option<String>,
}

/// Contents of a seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    /// Product taxonomy.
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    /// Retail chains.
    #[serde(default)]
    pub chains: Vec<SeedChain>,
    /// Known stores.
    #[serde(default)]
    pub stores: Vec<SeedStore>,
}

impl SeedData {
    /// Parse seed JSON.
    ///
    /// # Errors
    /// Returns [`SeedError::Parse`] for malformed JSON.
    ///
    /// # Examples
    /// ```
    /// use pazar_data::SeedData;
    ///
    /// let seed = SeedData::from_json_str(r#"{"chains": [{"name": "Lidl", "aliases": ["лидл"]}]}"#)?;
    /// assert_eq!(seed.chains[0].aliases, ["лидл"]);
    /// assert!(seed.stores.is_empty());
    /// # Ok::<(), pazar_data::SeedError>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, SeedError> {
        serde_json::from_str(json).map_err(|source| SeedError::Parse { source })
    }

    /// Read and parse the seed file at `path`.
    ///
    /// # Errors
    /// Returns [`SeedError::Read`] when the file cannot be read and
    /// [`SeedError::Parse`] when its contents are malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, SeedError> {
        let json = pazar_fs::read_utf8_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Counts of rows written by [`apply_seed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Categories inserted.
    pub categories_added: usize,
    /// Chains present after seeding.
    pub chains: usize,
    /// Aliases inserted.
    pub aliases_added: usize,
    /// Stores present after seeding.
    pub stores: usize,
}

/// Write `seed` into `repository`.
///
/// Every chain's lowercased name is registered as an alias alongside the
/// listed ones. Store coordinates are validated before anything is written.
///
/// # Errors
/// Returns [`SeedError::UnknownChain`] or [`SeedError::Coordinates`] for
/// inconsistent seeds and [`SeedError::Repository`] on database failures.
pub fn apply_seed(repository: &SqliteRepository, seed: &SeedData) -> Result<SeedSummary, SeedError> {
    let locations = seed
        .stores
        .iter()
        .map(|store| {
            if let Some(chain) = &store.chain
                && !seed.chains.iter().any(|c| &c.name == chain)
            {
                return Err(SeedError::UnknownChain {
                    address: store.address.clone(),
                    chain: chain.clone(),
                });
            }
            store
                .coords
                .as_deref()
                .map(parse_coordinates)
                .transpose()
                .map_err(|source| SeedError::Coordinates {
                    address: store.address.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut summary = SeedSummary::default();
    for category in &seed.categories {
        let record = Category {
            id: category.id,
            name: category.name.clone(),
        };
        if repository.insert_category(&record)? {
            summary.categories_added += 1;
        }
    }

    let mut chain_ids = Vec::with_capacity(seed.chains.len());
    for chain in &seed.chains {
        let id = repository.insert_chain(&chain.name)?;
        let own_name = chain.name.to_lowercase();
        for alias in std::iter::once(&own_name).chain(&chain.aliases) {
            if repository.insert_chain_alias(alias, id)? {
                summary.aliases_added += 1;
            }
        }
        chain_ids.push((chain.name.as_str(), id));
    }

    for (store, location) in seed.stores.iter().zip(locations) {
        let chain_id = store.chain.as_deref().and_then(|name| {
            chain_ids
                .iter()
                .find(|(chain, _)| *chain == name)
                .map(|(_, id)| *id)
        });
        repository.insert_store(
            chain_id,
            &store.address,
            store.populated_area.as_deref(),
            location,
        )?;
    }

    summary.chains = repository.chains()?.len();
    summary.stores = repository.stores(None)?.len();
    info!(
        "seeded {} new categories, {} new aliases; {} chains and {} stores present",
        summary.categories_added, summary.aliases_added, summary.chains, summary.stores
    );
    Ok(summary)
}

/// Outcome of [`locate_stores`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LocateSummary {
    /// Stores that received coordinates.
    pub located: usize,
    /// Stores the geocoder did not know.
    pub not_found: usize,
    /// Stores whose lookup failed.
    pub failed: usize,
}

/// Geocode every store that has no coordinates yet.
///
/// The query is the store address followed by its populated area. Geocoder
/// failures are logged and counted; they do not stop the run.
///
/// # Errors
/// Returns [`SeedError::Repository`] on database failures.
pub fn locate_stores<G: Geocoder + ?Sized>(
    repository: &SqliteRepository,
    geocoder: &G,
) -> Result<LocateSummary, SeedError> {
    let mut summary = LocateSummary::default();
    for store in repository.stores(None)? {
        if store.location.is_some() {
            continue;
        }
        let query = match &store.populated_area {
            Some(area) if !area.is_empty() => format!("{}, {area}", store.address),
            _ => store.address.clone(),
        };
        match geocoder.geocode(&query) {
            Ok(Some(location)) => {
                repository.set_store_location(store.id, location)?;
                summary.located += 1;
            }
            Ok(None) => summary.not_found += 1,
            Err(err) => {
                warn!("geocoding store {} ('{query}') failed: {err}", store.id);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
