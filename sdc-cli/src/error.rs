//! Error types emitted by the CLI.
//!
//! Row-level sync failures never surface here: the driver turns them into
//! outcomes. These variants cover configuration, files and whole-run failures.

use std::sync::Arc;

use camino::Utf8PathBuf;
use sdc_core::{IdError, SinkError, SyncError};
use sdc_data::TransportBuildError;
use thiserror::Error;

/// Errors emitted by the `commons-sdc` CLI.
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
        /// Flag name.
        field: &'static str,
        /// Environment variable name.
        env: &'static str,
    },
    /// A `--properties` entry is not of the form `P<digits>=<column>`.
    #[error("invalid property mapping '{entry}' (expected P<digits>=<column>)")]
    InvalidPropertyMapping {
        /// The offending entry.
        entry: String,
    },
    /// An identifier option could not be parsed.
    #[error("invalid --{field}: {source}")]
    InvalidArgument {
        /// Flag name.
        field: &'static str,
        /// Parse failure.
        #[source]
        source: IdError,
    },
    /// The input sheet could not be opened.
    #[error("failed to open input {path}: {source}")]
    OpenInput {
        /// Input path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The input sheet is not valid CSV.
    #[error("failed to read input {path}: {source}")]
    ReadInput {
        /// Input path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: csv::Error,
    },
    /// Required columns are absent from the header row.
    #[error("{path} is missing required column(s): {}", columns.join(", "))]
    MissingColumns {
        /// Input path.
        path: Utf8PathBuf,
        /// Absent column names.
        columns: Vec<String>,
    },
    /// A row has neither a media id column nor a file reference.
    #[error(
        "{path} line {line}: {file_column} is empty and there is no {mid_column} column to fall back on"
    )]
    UnresolvableRow {
        /// Input path.
        path: Utf8PathBuf,
        /// One-based line number, header included.
        line: u64,
        /// File reference column.
        file_column: String,
        /// Media id column.
        mid_column: String,
    },
    /// An output file could not be created.
    #[error("failed to create {path}: {source}")]
    CreateOutput {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The outcome log header could not be written.
    #[error("failed to write outcome log {path}: {source}")]
    WriteLog {
        /// Log path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: csv::Error,
    },
    /// An outcome could not be recorded mid-run.
    #[error(transparent)]
    OutcomeLog(#[from] SinkError),
    /// The HTTP transport could not be built.
    #[error("failed to set up the API transport: {0}")]
    Transport(#[from] TransportBuildError),
    /// The category extraction failed.
    #[error("category extraction failed: {0}")]
    Extract(#[from] SyncError),
    /// The extraction report could not be written.
    #[error("failed to write report {path}: {source}")]
    WriteReport {
        /// Report path.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The report could not be echoed to standard output.
    #[error("failed to print report: {0}")]
    PrintReport(#[source] std::io::Error),
    /// The run summary could not be printed.
    #[error("failed to write summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}
