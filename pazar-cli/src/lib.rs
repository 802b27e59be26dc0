//! Command-line interface for the Pazar grocery price engine.
//!
//! Three subcommands cover the lifecycle of a price database:
//! - `seed` loads categories, chains and stores from a JSON seed file and can
//!   geocode stores that lack coordinates.
//! - `import` reads a zip archive of price feeds into the database.
//! - `rank` orders stores by the estimated cost of a shopping list.
//!
//! Every option can also come from a configuration file or a `PAZAR_*`
//! environment variable.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod error;
mod import;
mod output;
mod rank;
mod seed;

pub use error::CliError;

use import::ImportArgs;
use rank::RankArgs;
use seed::SeedArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_SEED: &str = "seed";
pub(crate) const ARG_GEOCODE: &str = "geocode";
pub(crate) const ARG_GEOCODER_URL: &str = "geocoder-url";
pub(crate) const ARG_ARCHIVE: &str = "archive";
pub(crate) const ARG_WORKERS: &str = "workers";
pub(crate) const ARG_COORDS: &str = "coords";
pub(crate) const ARG_ADDRESS: &str = "address";
pub(crate) const ARG_COST_PER_KM: &str = "cost-per-km";
pub(crate) const ENV_SEED_DATABASE: &str = "PAZAR_CMDS_SEED_DATABASE";
pub(crate) const ENV_SEED_FILE: &str = "PAZAR_CMDS_SEED_SEED";
pub(crate) const ENV_IMPORT_DATABASE: &str = "PAZAR_CMDS_IMPORT_DATABASE";
pub(crate) const ENV_IMPORT_ARCHIVE: &str = "PAZAR_CMDS_IMPORT_ARCHIVE";
pub(crate) const ENV_RANK_DATABASE: &str = "PAZAR_CMDS_RANK_DATABASE";

/// Run the Pazar CLI with the current process arguments and environment.
///
/// Command output is written to standard output as JSON.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid or the command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Seed(args) => seed::run_seed(args, &mut stdout),
        Command::Import(args) => import::run_import(args, &mut stdout),
        Command::Rank(args) => rank::run_rank(args, &mut stdout),
    }
}

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG` (default
/// `info`).
///
/// Records emitted through the `log` facade by the library crates are
/// forwarded to the subscriber. Calling this more than once is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
    if installed.is_err() {
        log::debug!("a global subscriber is already installed");
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pazar",
    about = "Grocery price database and shopping-list store ranking",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load reference data from a JSON seed file.
    Seed(SeedArgs),
    /// Import a zip archive of price feeds.
    Import(ImportArgs),
    /// Rank stores for a shopping list.
    Rank(RankArgs),
}

#[cfg(test)]
mod tests;
