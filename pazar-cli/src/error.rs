//! Error types emitted by the Pazar CLI.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pazar_core::{CatalogError, GeocodeError, RepositoryError};
use pazar_data::{FeedError, GeocoderBuildError, SeedError};
use pazar_ranker::RankingError;
use thiserror::Error;

/// Errors emitted by the Pazar CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Two options that exclude each other were both set.
    #[error("--{first} and --{second} cannot be combined")]
    ConflictingArguments {
        first: &'static str,
        second: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The directory holding the database could not be created.
    #[error("failed to create the directory for {path:?}: {source}")]
    CreateDatabaseDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening or querying the SQLite database failed.
    #[error("database {path:?} failed: {source}")]
    Database {
        path: Utf8PathBuf,
        #[source]
        source: RepositoryError,
    },
    /// Loading or applying the seed file failed.
    #[error("failed to seed the database: {0}")]
    Seed(#[from] SeedError),
    /// The feed archive could not be read.
    #[error("failed to read the feed archive: {0}")]
    Feed(#[from] FeedError),
    /// The reference catalog was inconsistent.
    #[error("failed to load the reference catalog: {0}")]
    Catalog(#[from] CatalogError),
    /// Constructing the geocoding client failed.
    #[error("failed to build the geocoder: {0}")]
    BuildGeocoder(#[from] GeocoderBuildError),
    /// Geocoding the user's address failed.
    #[error("failed to geocode {address:?}: {source}")]
    Geocode {
        address: String,
        #[source]
        source: GeocodeError,
    },
    /// Ranking the stores failed.
    #[error("failed to rank stores: {0}")]
    Rank(#[from] RankingError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
