//! Data acquisition and ingestion for the Pazar price engine.
//!
//! Responsibilities:
//! - Read price feeds delivered as zip archives of delimited files.
//! - Import feed rows as products, resolving stores by address.
//! - Geocode store addresses through a Photon-compatible HTTP service.
//! - Apply JSON seed files of categories, chains and stores.
//!
//! Boundaries:
//! - Do not encode matching or ranking rules (live in `pazar-core` and
//!   `pazar-ranker`).
//! - Keep per-row data-quality problems local: they are counted, not raised.
//!
//! Invariants:
//! - A repository session is never shared between import workers.
//! - No global mutable state.

pub mod feed;
pub mod geocoding;
pub mod import;
pub mod seed;

pub use feed::{FeedError, FeedFile, FeedRow, read_feed_archive, read_feed_csv, read_feed_zip};
pub use geocoding::{GeocoderBuildError, PhotonGeocoder, PhotonGeocoderConfig, clean_address};
pub use import::{FeedImporter, FileImportReport, FileOutcome, FileSummary, ImportError, ImportReport};
pub use seed::{LocateSummary, SeedData, SeedError, SeedSummary, apply_seed, locate_stores};
