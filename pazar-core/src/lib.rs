//! Core domain types for the Pazar grocery price engine.
//!
//! The crate holds everything that is independent of I/O transport:
//! reference records and price observations, the product-description
//! normaliser, fuzzy text matching, address resolution, great-circle
//! distance, and the repository and geocoder seams. A SQLite repository is
//! available behind the `store-sqlite` feature.
//!
//! ```
//! use pazar_core::{Unit, parse_product};
//!
//! let sausages = parse_product("2x500Г кренвирши");
//! assert_eq!(sausages.name, "кренвирши");
//! assert_eq!((sausages.quantity, sausages.unit), (1.0, Unit::Kilogram));
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod address;
pub mod catalog;
pub mod distance;
pub mod geocode;
pub mod matching;
mod model;
pub mod quantity;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use address::{ADDRESS_MATCH_THRESHOLD, AddressMatch, AddressResolver, normalize_address};
pub use catalog::{Catalog, CatalogError, CatalogRecords};
pub use distance::{
    CoordinatesError, EARTH_RADIUS_KM, PENALTY_DISTANCE_KM, distance_between, distance_or_penalty,
    format_coordinates, haversine_km, parse_coordinates,
};
pub use geocode::{GeocodeError, Geocoder, MemoizedGeocoder};
pub use matching::{Match, PartialScorer, SimilarityScorer, TokenSetScorer, best_match};
pub use model::{
    Category, Chain, ChainAlias, NewProduct, Product, ProductError, Store, Unit, UnitRecord,
};
pub use quantity::{ParsedProduct, parse_product};
#[cfg(feature = "store-sqlite")]
pub use store::SqliteRepository;
pub use store::{ProductFilter, Repository, RepositoryError};
