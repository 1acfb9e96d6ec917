//! The `write` subcommand: add the claims listed in a CSV sheet.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use sdc_core::{
    ClaimMutator, ClaimReader, DEFAULT_PAUSE, Driver, DriverConfig, DriverReport, InputRow,
    OutcomeSink, Pacer, ThreadPacer, TitleLookup,
};
use sdc_data::{CommonsClient, Credentials, ResilientTransport, Session, TransportConfig};
use serde::{Deserialize, Serialize};

use crate::outcome_log::CsvOutcomeLog;
use crate::rows::{self, RowLayout};
use crate::transport::TransportOptions;
use crate::{
    ARG_COMMONS_API, ARG_MAX_ATTEMPTS, ARG_TIMEOUT_SECS, ARG_USER_AGENT, ARG_WRITE_COMMIT,
    ARG_WRITE_FILE_COLUMN, ARG_WRITE_INPUT, ARG_WRITE_LOG, ARG_WRITE_MAX_OPS,
    ARG_WRITE_MID_COLUMN, ARG_WRITE_PASSWORD, ARG_WRITE_PAUSE_MS, ARG_WRITE_PROPERTIES,
    ARG_WRITE_USERNAME, CliError, ENV_WRITE_INPUT, ENV_WRITE_PROPERTIES, ENV_WRITE_USER_AGENT,
};

pub(crate) const DEFAULT_FILE_COLUMN: &str = "CommonsFile";
pub(crate) const DEFAULT_MID_COLUMN: &str = "CommonsMid";
pub(crate) const DEFAULT_LOG_TEMPLATE: &str = "logs/write_sdc_log_{timestamp}.csv";
const LOG_STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// CLI arguments for the `write` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "write",
    long_about = "Add item-valued claims (such as P180 \"depicts\") to Commons \
                 files listed in a CSV sheet. Values already present are \
                 skipped. Runs simulate by default; pass --commit to edit.",
    about = "Add claims from a CSV sheet to Commons files"
)]
#[ortho_config(prefix = "SDC")]
pub(crate) struct WriteArgs {
    /// CSV sheet with a header row.
    #[arg(long = ARG_WRITE_INPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Property to column mapping, e.g. `P180=QidDepicts,P170=QidCreator`.
    #[arg(long = ARG_WRITE_PROPERTIES, value_name = "map")]
    #[serde(default)]
    pub(crate) properties: Option<String>,
    /// Column holding file URLs, titles or names (default `CommonsFile`).
    #[arg(long = ARG_WRITE_FILE_COLUMN, value_name = "name")]
    #[serde(default)]
    pub(crate) file_column: Option<String>,
    /// Column holding media ids such as `M123` (default `CommonsMid`).
    #[arg(long = ARG_WRITE_MID_COLUMN, value_name = "name")]
    #[serde(default)]
    pub(crate) mid_column: Option<String>,
    /// Outcome log path; `{timestamp}` is replaced by the run start time.
    #[arg(long = ARG_WRITE_LOG, value_name = "path")]
    #[serde(default)]
    pub(crate) log: Option<Utf8PathBuf>,
    /// Pause after each attempted edit, in milliseconds (default 500).
    #[arg(long = ARG_WRITE_PAUSE_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) pause_ms: Option<u64>,
    /// Stop creating claims after this many.
    #[arg(long = ARG_WRITE_MAX_OPS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_ops: Option<usize>,
    /// Write to Commons instead of simulating.
    #[arg(long = ARG_WRITE_COMMIT)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) commit: bool,
    /// Bot-password account name, e.g. `Example@sync-bot`.
    #[arg(long = ARG_WRITE_USERNAME, value_name = "name")]
    #[serde(default)]
    pub(crate) username: Option<String>,
    /// Bot password.
    #[arg(long = ARG_WRITE_PASSWORD, value_name = "secret")]
    #[serde(default)]
    pub(crate) password: Option<String>,
    /// User agent sent with every request, with contact details.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Commons API endpoint.
    #[arg(long = ARG_COMMONS_API, value_name = "url")]
    #[serde(default)]
    pub(crate) commons_api: Option<String>,
    /// Attempts per request before giving up (default 5).
    #[arg(long = ARG_MAX_ATTEMPTS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
    /// Per-request timeout in seconds (default 30).
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl WriteArgs {
    fn into_config(self) -> Result<WriteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        WriteConfig::try_from(merged)
    }
}

/// Resolved `write` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WriteConfig {
    pub(crate) input: Utf8PathBuf,
    pub(crate) layout: RowLayout,
    /// Log path, possibly containing `{timestamp}`.
    pub(crate) log_template: Utf8PathBuf,
    pub(crate) driver: DriverConfig,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) transport: TransportConfig,
}

impl WriteConfig {
    /// Log path for a run started at `stamp`.
    pub(crate) fn log_path(&self, stamp: &str) -> Utf8PathBuf {
        sdc_fs::expand_timestamp(&self.log_template, stamp)
    }
}

impl TryFrom<WriteArgs> for WriteConfig {
    type Error = CliError;

    fn try_from(args: WriteArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_WRITE_INPUT,
            env: ENV_WRITE_INPUT,
        })?;
        let properties = args.properties.ok_or(CliError::MissingArgument {
            field: ARG_WRITE_PROPERTIES,
            env: ENV_WRITE_PROPERTIES,
        })?;
        let layout = RowLayout {
            file_column: args
                .file_column
                .unwrap_or_else(|| DEFAULT_FILE_COLUMN.to_owned()),
            mid_column: args
                .mid_column
                .unwrap_or_else(|| DEFAULT_MID_COLUMN.to_owned()),
            mappings: rows::parse_property_map(&properties)?,
        };
        let transport = TransportOptions {
            user_agent: args.user_agent,
            commons_api: args.commons_api,
            wikidata_api: None,
            max_attempts: args.max_attempts,
            timeout_secs: args.timeout_secs,
        }
        .into_config(ENV_WRITE_USER_AGENT)?;
        let credentials = match (args.username, args.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        };
        let driver = DriverConfig::default()
            .with_pause(args.pause_ms.map_or(DEFAULT_PAUSE, Duration::from_millis))
            .with_max_ops(args.max_ops)
            .with_simulate(!args.commit);
        Ok(Self {
            input,
            layout,
            log_template: args
                .log
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_LOG_TEMPLATE)),
            driver,
            credentials,
            transport,
        })
    }
}

pub(super) fn run_write(args: WriteArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let loaded = rows::load_rows(&config.input, &config.layout)?;
    info!(
        "{} operation(s) read from {} row(s) of {}",
        loaded.rows.len(),
        loaded.records,
        config.input
    );
    let transport = ResilientTransport::connect(&config.transport)?;
    let session = Session::establish(
        &transport,
        config.credentials.as_ref(),
        !config.driver.simulate,
    );
    let client = CommonsClient::new(&transport, session);
    let log_path = config.log_path(&Local::now().format(LOG_STAMP_FORMAT).to_string());
    let mut log = CsvOutcomeLog::create(&log_path)?;

    let report = execute_write(&client, &ThreadPacer, config.driver, loaded.rows, &mut log)?;

    let mut stdout = std::io::stdout().lock();
    write_summary(&mut stdout, loaded.records, &report, &log_path)
}

/// Run `rows` through the driver, recording every outcome in `sink`.
pub(super) fn execute_write<S, P, K>(
    store: &S,
    pacer: &P,
    driver: DriverConfig,
    rows: Vec<InputRow>,
    sink: &mut K,
) -> Result<DriverReport, CliError>
where
    S: ClaimReader + ClaimMutator + TitleLookup + ?Sized,
    P: Pacer + ?Sized,
    K: OutcomeSink + ?Sized,
{
    if driver.simulate {
        info!("Simulate mode: no claims will be written (pass --{ARG_WRITE_COMMIT} to edit)");
    }
    let report = Driver::new(store, pacer, driver).run(rows, sink)?;
    Ok(report)
}

/// Print the end-of-run totals.
pub(super) fn write_summary(
    writer: &mut dyn Write,
    records: usize,
    report: &DriverReport,
    log_path: &Utf8Path,
) -> Result<(), CliError> {
    let tally = &report.tally;
    writeln!(
        writer,
        "{rule}\n\
         Rows read: {records}\n\
         Operations: {total}\n\
         Added: {added}\n\
         Would add: {would_add}\n\
         Skipped (duplicates): {duplicates}\n\
         Skipped (invalid): {invalid}\n\
         Skipped (cap): {capped}\n\
         Errors: {errors}\n\
         Log CSV: {log_path}",
        rule = "-".repeat(60),
        total = tally.total(),
        added = tally.added,
        would_add = tally.would_add,
        duplicates = tally.skipped_duplicate,
        invalid = tally.skipped_invalid,
        capped = tally.skipped_cap,
        errors = tally.errors,
    )
    .map_err(CliError::WriteSummary)
}
