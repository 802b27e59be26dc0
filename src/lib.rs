//! Facade crate for the Pazar grocery price engine.
//!
//! This crate re-exports the core domain types and exposes the store ranker
//! and the feed ingestion pipeline behind feature flags.

#![forbid(unsafe_code)]

pub use pazar_core::{
    AddressMatch, AddressResolver, Catalog, CatalogError, Category, Chain, ChainAlias,
    CoordinatesError, GeocodeError, Geocoder, MemoizedGeocoder, NewProduct, PENALTY_DISTANCE_KM,
    ParsedProduct, Product, ProductError, ProductFilter, Repository, RepositoryError, Store, Unit,
    distance_or_penalty, haversine_km, normalize_address, parse_coordinates, parse_product,
};

#[cfg(feature = "store-sqlite")]
pub use pazar_core::SqliteRepository;

#[cfg(feature = "ranker")]
pub use pazar_ranker::{
    CategoryMatch, CategoryMatcher, ChosenItem, RankingConfig, RankingEngine, RankingEntry,
    RankingError,
};

#[cfg(feature = "ingest")]
pub use pazar_data::{
    FeedImporter, ImportReport, PhotonGeocoder, SeedData, apply_seed, read_feed_archive,
};
