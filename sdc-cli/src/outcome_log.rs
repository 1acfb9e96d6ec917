//! CSV audit log of write outcomes.

use std::io::Write;

use camino::Utf8Path;
use cap_std::fs_utf8::File;
use chrono::SecondsFormat;
use sdc_core::{MediaId, Outcome, OutcomeSink, SinkError};

use crate::CliError;

/// Column names of the outcome log, in order.
pub(crate) const LOG_COLUMNS: [&str; 9] = [
    "timestamp",
    "commons_mid",
    "commons_file",
    "property",
    "qid",
    "action",
    "details",
    "edit_id",
    "dry_run",
];

/// [`OutcomeSink`] writing one CSV line per outcome.
pub(crate) struct CsvOutcomeLog<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvOutcomeLog<File> {
    /// Create the log at `path`, creating parent directories as needed.
    pub(crate) fn create(path: &Utf8Path) -> Result<Self, CliError> {
        let file = sdc_fs::create_output(path).map_err(|source| CliError::CreateOutput {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_writer(file).map_err(|source| CliError::WriteLog {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<W: Write> CsvOutcomeLog<W> {
    /// Wrap `inner` and write the header row.
    pub(crate) fn from_writer(inner: W) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(LOG_COLUMNS)?;
        Ok(Self { writer })
    }
}

impl<W: Write> OutcomeSink for CsvOutcomeLog<W> {
    fn record(&mut self, outcome: &Outcome) -> Result<(), SinkError> {
        let timestamp = outcome
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let dry_run = if outcome.simulate { "true" } else { "false" };
        self.writer
            .write_record([
                timestamp.as_str(),
                outcome.subject.as_ref().map_or("", MediaId::as_str),
                outcome.file_ref.as_str(),
                outcome.property.as_str(),
                outcome.value.as_str(),
                outcome.kind.as_str(),
                outcome.detail.as_str(),
                outcome.confirmation.as_deref().unwrap_or_default(),
                dry_run,
            ])
            .map_err(SinkError::new)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().map_err(SinkError::new)
    }
}
