//! Command-line interface for the Commons structured-data synchroniser.
//!
//! Two subcommands are exposed:
//!
//! - `write` reads a CSV sheet and adds item-valued claims to Commons files,
//!   logging one outcome per operation to a CSV audit log;
//! - `extract` walks a Commons category and writes a delimited report of the
//!   values attached to each file, with their labels.
//!
//! Options come from CLI flags, `SDC_*` environment variables and
//! configuration files, merged by `ortho_config`.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::LevelFilter;

mod error;
mod extract;
mod outcome_log;
mod report;
mod rows;
mod transport;
mod write;

pub use error::CliError;

use extract::ExtractArgs;
use write::WriteArgs;

const ARG_WRITE_INPUT: &str = "input";
const ARG_WRITE_PROPERTIES: &str = "properties";
const ARG_WRITE_FILE_COLUMN: &str = "file-column";
const ARG_WRITE_MID_COLUMN: &str = "mid-column";
const ARG_WRITE_LOG: &str = "log";
const ARG_WRITE_PAUSE_MS: &str = "pause-ms";
const ARG_WRITE_MAX_OPS: &str = "max-ops";
const ARG_WRITE_COMMIT: &str = "commit";
const ARG_WRITE_USERNAME: &str = "username";
const ARG_WRITE_PASSWORD: &str = "password";
const ARG_EXTRACT_CATEGORY: &str = "category";
const ARG_EXTRACT_PROPERTY: &str = "property";
const ARG_EXTRACT_LANGUAGE: &str = "language";
const ARG_EXTRACT_LIMIT: &str = "limit";
const ARG_EXTRACT_OUTPUT: &str = "output";
const ARG_USER_AGENT: &str = "user-agent";
const ARG_COMMONS_API: &str = "commons-api";
const ARG_WIKIDATA_API: &str = "wikidata-api";
const ARG_MAX_ATTEMPTS: &str = "max-attempts";
const ARG_TIMEOUT_SECS: &str = "timeout-secs";
const ENV_WRITE_INPUT: &str = "SDC_CMDS_WRITE_INPUT";
const ENV_WRITE_PROPERTIES: &str = "SDC_CMDS_WRITE_PROPERTIES";
const ENV_WRITE_USER_AGENT: &str = "SDC_CMDS_WRITE_USER_AGENT";
const ENV_EXTRACT_CATEGORY: &str = "SDC_CMDS_EXTRACT_CATEGORY";
const ENV_EXTRACT_USER_AGENT: &str = "SDC_CMDS_EXTRACT_USER_AGENT";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, when
/// input or output files cannot be used, or when an extraction fails.
/// Failures of individual write operations are logged as outcomes instead.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose);
    match cli.command {
        Command::Write(args) => write::run_write(args),
        Command::Extract(args) => extract::run_extract(args),
    }
}

fn init_logging(verbose: bool) {
    let mut builder = colog::default_builder();
    builder.filter(None, log_level(verbose));
    builder.init();
}

const fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "commons-sdc",
    about = "Synchronise Wikimedia Commons structured data with tabular files",
    version
)]
struct Cli {
    /// Log debug detail such as existing claims and page fetches.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add item-valued claims from a CSV sheet to Commons files.
    Write(WriteArgs),
    /// Report the values attached to the files of a Commons category.
    Extract(ExtractArgs),
}

#[cfg(test)]
mod tests;
