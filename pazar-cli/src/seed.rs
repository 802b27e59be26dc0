//! Seed command implementation for the Pazar CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pazar_core::{Geocoder, MemoizedGeocoder};
use pazar_data::geocoding::DEFAULT_BASE_URL;
use pazar_data::{LocateSummary, PhotonGeocoder, SeedData, SeedSummary, apply_seed, locate_stores};
use serde::{Deserialize, Serialize};

use crate::output::{open_database, require_existing, write_json};
use crate::{
    ARG_DATABASE, ARG_GEOCODE, ARG_GEOCODER_URL, ARG_SEED, CliError, ENV_SEED_DATABASE,
    ENV_SEED_FILE,
};

/// CLI arguments for the `seed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Create or update a price database from a JSON seed file of \
                 categories, chains with their aliases, and stores. Records \
                 that already exist are left untouched, so seeding twice is \
                 harmless. With --geocode, stores without coordinates are \
                 looked up through a Photon geocoding service.",
    about = "Load categories, chains and stores into the database"
)]
#[ortho_config(prefix = "PAZAR")]
pub(crate) struct SeedArgs {
    /// Path to the SQLite database; created when missing.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the JSON seed file.
    #[arg(long = ARG_SEED, value_name = "path")]
    #[serde(default)]
    pub(crate) seed: Option<Utf8PathBuf>,
    /// Geocode stores that have no coordinates after seeding.
    #[arg(long = ARG_GEOCODE)]
    #[serde(default)]
    pub(crate) geocode: bool,
    /// Base URL of the Photon geocoding service.
    #[arg(long = ARG_GEOCODER_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) geocoder_url: Option<String>,
}

impl SeedArgs {
    pub(crate) fn into_config(self) -> Result<SeedConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SeedConfig::try_from(merged)
    }
}

/// Resolved `seed` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) seed: Utf8PathBuf,
    pub(crate) geocode: bool,
    pub(crate) geocoder_url: String,
}

impl TryFrom<SeedArgs> for SeedConfig {
    type Error = CliError;

    fn try_from(args: SeedArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_SEED_DATABASE,
        })?;
        let seed = args.seed.ok_or(CliError::MissingArgument {
            field: ARG_SEED,
            env: ENV_SEED_FILE,
        })?;
        Ok(Self {
            database,
            seed,
            geocode: args.geocode,
            geocoder_url: args
                .geocoder_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        })
    }
}

/// What a `seed` run changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct SeedOutcome {
    pub(crate) seeded: SeedSummary,
    pub(crate) located: Option<LocateSummary>,
}

pub(crate) fn run_seed(args: SeedArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let outcome = if config.geocode {
        let geocoder = MemoizedGeocoder::new(PhotonGeocoder::new(config.geocoder_url.as_str())?);
        execute_seed(&config, Some(&geocoder))?
    } else {
        execute_seed(&config, None)?
    };
    write_json(writer, &outcome)
}

/// Apply the seed file and optionally locate stores without coordinates.
pub(crate) fn execute_seed(
    config: &SeedConfig,
    geocoder: Option<&dyn Geocoder>,
) -> Result<SeedOutcome, CliError> {
    require_existing(&config.seed, ARG_SEED)?;
    let seed = SeedData::load(&config.seed)?;
    pazar_fs::ensure_parent_dir(&config.database).map_err(|source| {
        CliError::CreateDatabaseDir {
            path: config.database.clone(),
            source,
        }
    })?;
    let repository = open_database(&config.database)?;
    let seeded = apply_seed(&repository, &seed)?;
    info!(
        "seeded {} categories, {} chains and {} stores into {}",
        seeded.categories_added, seeded.chains, seeded.stores, config.database
    );
    let located = geocoder
        .map(|geocoder| locate_stores(&repository, geocoder))
        .transpose()?;
    Ok(SeedOutcome { seeded, located })
}
