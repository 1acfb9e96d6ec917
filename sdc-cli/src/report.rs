//! Delimited report for the `extract` subcommand.
//!
//! The delimiter is several characters long, which rules out the `csv`
//! crate. Fields are escaped so that a reader can split on the delimiter:
//! backslashes are doubled, embedded delimiters get a backslash in front and
//! line breaks become spaces.

use std::io::{self, Write};

use chrono::NaiveDate;
use sdc_core::{CategoryName, LanguageCode, ReportRecord};

/// Field delimiter.
pub(crate) const REPORT_DELIMITER: &str = "^^^^";

/// Separator between the values of one record.
pub(crate) const VALUE_SEPARATOR: &str = " --- ";

const REPORT_COLUMNS: [&str; 4] = ["midURL", "title", "depicts_count", "depicts"];

/// Write the header and one line per record.
pub(crate) fn write_report<W: Write>(mut writer: W, records: &[ReportRecord]) -> io::Result<()> {
    writeln!(writer, "{}", REPORT_COLUMNS.join(REPORT_DELIMITER))?;
    for record in records {
        let values = record
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(VALUE_SEPARATOR);
        let fields = [
            record.subject.entity_url(),
            record.title.page_title(),
            record.value_count().to_string(),
            values,
        ];
        let line = fields
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(REPORT_DELIMITER);
        writeln!(writer, "{line}")?;
    }
    writer.flush()
}

/// Escape one field for the delimited format.
pub(crate) fn escape_field(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace(REPORT_DELIMITER, &format!("\\{REPORT_DELIMITER}"))
        .replace(['\r', '\n'], " ")
}

/// `<Category>_thingsdepicted_<LANG>_<ddmmyyyy>.csv`, keeping only ASCII
/// letters and digits of the category name.
pub(crate) fn default_report_name(
    category: &CategoryName,
    language: &LanguageCode,
    date: NaiveDate,
) -> String {
    let sanitized: String = category
        .name()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let stem = if sanitized.is_empty() {
        "CommonsCategory"
    } else {
        sanitized.as_str()
    };
    format!(
        "{stem}_thingsdepicted_{}_{}.csv",
        language.as_str().to_ascii_uppercase(),
        date.format("%d%m%Y")
    )
}
