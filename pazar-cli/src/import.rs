//! Import command implementation for the Pazar CLI.

use std::io::Write;
use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pazar_core::{Catalog, SqliteRepository};
use pazar_data::{FeedImporter, ImportReport, read_feed_archive};
use serde::{Deserialize, Serialize};

use crate::output::{open_database, require_existing, write_json};
use crate::{
    ARG_ARCHIVE, ARG_DATABASE, ARG_WORKERS, CliError, ENV_IMPORT_ARCHIVE, ENV_IMPORT_DATABASE,
};

/// Catalog version stamped on the lookup tables of an import run.
const CATALOG_VERSION: u64 = 1;

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Import a zip archive of per-chain price feeds into a seeded \
                 database. Each delimited file is matched to a chain by its \
                 name, rows are matched to stores by address, and a summary \
                 of every file is printed as JSON.",
    about = "Import a zip archive of price feeds"
)]
#[ortho_config(prefix = "PAZAR")]
pub(crate) struct ImportArgs {
    /// Path to a seeded SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Path to the zip archive of feed files.
    #[arg(long = ARG_ARCHIVE, value_name = "path")]
    #[serde(default)]
    pub(crate) archive: Option<Utf8PathBuf>,
    /// Number of worker threads; defaults to the available parallelism.
    #[arg(long = ARG_WORKERS, value_name = "count")]
    #[serde(default)]
    pub(crate) workers: Option<NonZeroUsize>,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) archive: Utf8PathBuf,
    pub(crate) workers: NonZeroUsize,
}

impl ImportConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_existing(&self.database, ARG_DATABASE)?;
        require_existing(&self.archive, ARG_ARCHIVE)?;
        Ok(())
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_IMPORT_DATABASE,
        })?;
        let archive = args.archive.ok_or(CliError::MissingArgument {
            field: ARG_ARCHIVE,
            env: ENV_IMPORT_ARCHIVE,
        })?;
        let workers = args.workers.unwrap_or_else(|| {
            std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
        });
        Ok(Self {
            database,
            archive,
            workers,
        })
    }
}

pub(crate) fn run_import(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_import(&config)?;
    write_json(writer, &report)
}

/// Read the archive and import every feed file.
///
/// Failures confined to single files are part of the report, not errors.
pub(crate) fn execute_import(config: &ImportConfig) -> Result<ImportReport, CliError> {
    config.validate_sources()?;
    let files = read_feed_archive(&config.archive)?;
    let catalog = Catalog::load(&open_database(&config.database)?, CATALOG_VERSION)?;
    let database = config.database.clone();
    let report = FeedImporter::new(&catalog).import_parallel(&files, config.workers, || {
        SqliteRepository::open(&database)
    });
    let failed = report.failed().count();
    if failed > 0 {
        warn!("{failed} of {} feed file(s) failed to import", report.files.len());
    }
    info!(
        "imported {} product(s) from {} into {}",
        report.imported_rows(),
        config.archive,
        config.database
    );
    Ok(report)
}
