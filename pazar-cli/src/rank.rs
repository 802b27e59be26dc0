//! Rank command implementation for the Pazar CLI.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use log::warn;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pazar_core::{Geocoder, format_coordinates};
use pazar_data::PhotonGeocoder;
use pazar_data::geocoding::DEFAULT_BASE_URL;
use pazar_ranker::{RankingConfig, RankingEngine, RankingEntry};
use serde::{Deserialize, Serialize};

use crate::output::{open_database, require_existing, write_json};
use crate::{
    ARG_ADDRESS, ARG_COORDS, ARG_COST_PER_KM, ARG_DATABASE, ARG_GEOCODER_URL, CliError,
    ENV_RANK_DATABASE,
};

/// Position used when neither coordinates nor an address are given.
pub(crate) const DEFAULT_POSITION: &str = "43.2047, 27.9100";

/// CLI arguments for the `rank` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Rank the stores in a price database for a shopping list. \
                 Each term is matched to a product category; stores are \
                 ordered by basket price plus penalties for missing items \
                 plus travel cost from the given position. The ranking is \
                 printed as JSON.",
    about = "Rank stores for a shopping list"
)]
#[ortho_config(prefix = "PAZAR")]
pub(crate) struct RankArgs {
    /// Shopping-list terms, for example `хляб мляко`.
    #[arg(value_name = "term")]
    #[serde(default)]
    pub(crate) terms: Vec<String>,
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// User position as "lat, lon".
    #[arg(long = ARG_COORDS, value_name = "lat, lon", conflicts_with = "address")]
    #[serde(default)]
    pub(crate) coords: Option<String>,
    /// User address, resolved through the geocoding service.
    #[arg(long = ARG_ADDRESS, value_name = "text")]
    #[serde(default)]
    pub(crate) address: Option<String>,
    /// Base URL of the Photon geocoding service.
    #[arg(long = ARG_GEOCODER_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) geocoder_url: Option<String>,
    /// Travel cost in currency units per kilometre.
    #[arg(long = ARG_COST_PER_KM, value_name = "amount")]
    #[serde(default)]
    pub(crate) cost_per_km: Option<f64>,
}

impl RankArgs {
    pub(crate) fn into_config(self) -> Result<RankConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RankConfig::try_from(merged)
    }
}

/// Where the user stands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Position {
    /// A `"lat, lon"` string, used as given.
    Coordinates(String),
    /// Free text to geocode.
    Address(String),
}

/// Resolved `rank` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RankConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) position: Position,
    pub(crate) geocoder_url: String,
    pub(crate) ranking: RankingConfig,
    pub(crate) terms: Vec<String>,
}

impl TryFrom<RankArgs> for RankConfig {
    type Error = CliError;

    fn try_from(args: RankArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_RANK_DATABASE,
        })?;
        let position = match (args.coords, args.address) {
            (Some(_), Some(_)) => {
                return Err(CliError::ConflictingArguments {
                    first: ARG_COORDS,
                    second: ARG_ADDRESS,
                });
            }
            (Some(coords), None) => Position::Coordinates(coords),
            (None, Some(address)) => Position::Address(address),
            (None, None) => Position::Coordinates(DEFAULT_POSITION.to_owned()),
        };
        let defaults = RankingConfig::default();
        Ok(Self {
            database,
            position,
            geocoder_url: args
                .geocoder_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            ranking: RankingConfig {
                cost_per_km: args.cost_per_km.unwrap_or(defaults.cost_per_km),
                ..defaults
            },
            terms: args.terms,
        })
    }
}

pub(crate) fn run_rank(args: RankArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let position = match &config.position {
        Position::Coordinates(coords) => coords.clone(),
        Position::Address(address) => {
            let geocoder = PhotonGeocoder::new(config.geocoder_url.as_str())?;
            locate_user(&geocoder, address)?
        }
    };
    let ranking = execute_rank(&config, &position)?;
    write_json(writer, &ranking)
}

/// Geocode the user's address into a `"lat, lon"` string.
///
/// An address the service does not know yields an empty position, which the
/// ranking charges at the penalty distance.
pub(crate) fn locate_user(geocoder: &dyn Geocoder, address: &str) -> Result<String, CliError> {
    match geocoder.geocode(address) {
        Ok(Some(coord)) => Ok(format_coordinates(coord)),
        Ok(None) => {
            warn!("address {address:?} was not found; distances use the penalty");
            Ok(String::new())
        }
        Err(source) => Err(CliError::Geocode {
            address: address.to_owned(),
            source,
        }),
    }
}

/// Rank the database's stores for the configured terms from `position`.
pub(crate) fn execute_rank(
    config: &RankConfig,
    position: &str,
) -> Result<Vec<RankingEntry>, CliError> {
    require_existing(&config.database, ARG_DATABASE)?;
    let repository = open_database(&config.database)?;
    let engine = RankingEngine::new(config.ranking)?;
    Ok(engine.rank(&repository, &config.terms, position)?)
}
