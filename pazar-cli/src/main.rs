//! Entry point for the `pazar` command-line interface.
#![forbid(unsafe_code)]

use pazar_cli::CliError;

fn main() {
    pazar_cli::init_logging();
    match pazar_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("pazar: {err}");
            std::process::exit(1);
        }
    }
}
