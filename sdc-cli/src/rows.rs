//! CSV sheet ingestion for the `write` subcommand.

use std::io::Read;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, Trim};
use sdc_core::{InputRow, PropertyId};

use crate::CliError;

/// A property and the column holding its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropertyColumn {
    pub(crate) property: PropertyId,
    pub(crate) column: String,
}

/// Where to find each input in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RowLayout {
    pub(crate) file_column: String,
    pub(crate) mid_column: String,
    pub(crate) mappings: Vec<PropertyColumn>,
}

/// Operations read from a sheet.
#[derive(Debug, Default)]
pub(crate) struct LoadedRows {
    /// Data records in the sheet, header excluded.
    pub(crate) records: usize,
    /// One entry per non-empty value cell, in sheet order.
    pub(crate) rows: Vec<InputRow>,
}

/// Parse `P180=QidDepicts,P170=QidCreator` into property columns.
pub(crate) fn parse_property_map(raw: &str) -> Result<Vec<PropertyColumn>, CliError> {
    let mut mappings = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = || CliError::InvalidPropertyMapping {
            entry: entry.to_owned(),
        };
        let (property, column) = entry.split_once('=').ok_or_else(invalid)?;
        let property = PropertyId::new(property)
            .ok()
            .filter(PropertyId::is_wikibase_shaped)
            .ok_or_else(invalid)?;
        let column = column.trim();
        if column.is_empty() {
            return Err(invalid());
        }
        mappings.push(PropertyColumn {
            property,
            column: column.to_owned(),
        });
    }
    if mappings.is_empty() {
        return Err(CliError::InvalidPropertyMapping {
            entry: raw.to_owned(),
        });
    }
    Ok(mappings)
}

/// Read the sheet at `path`.
pub(crate) fn load_rows(path: &Utf8Path, layout: &RowLayout) -> Result<LoadedRows, CliError> {
    let file = sdc_fs::open_input(path).map_err(|source| CliError::OpenInput {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows(file, path, layout)
}

/// Read rows from any CSV source; `path` is used in error messages.
pub(crate) fn read_rows<R: Read>(
    reader: R,
    path: &Utf8Path,
    layout: &RowLayout,
) -> Result<LoadedRows, CliError> {
    let read_error = |source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    };
    let mut csv = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = csv.headers().map_err(read_error)?.clone();
    let columns = Columns::locate(&headers, layout).map_err(|missing| CliError::MissingColumns {
        path: path.to_path_buf(),
        columns: missing,
    })?;

    let mut loaded = LoadedRows::default();
    let mut record = StringRecord::new();
    while csv.read_record(&mut record).map_err(read_error)? {
        loaded.records += 1;
        let file_ref = record.get(columns.file).unwrap_or_default();
        let media_id = columns
            .mid
            .and_then(|idx| record.get(idx))
            .filter(|cell| !cell.is_empty());
        if columns.mid.is_none() && file_ref.is_empty() {
            return Err(CliError::UnresolvableRow {
                path: path.to_path_buf(),
                line: record.position().map_or(0, csv::Position::line),
                file_column: layout.file_column.clone(),
                mid_column: layout.mid_column.clone(),
            });
        }
        for (property, idx) in &columns.values {
            let value = record.get(*idx).unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            loaded.rows.push(InputRow {
                file_ref: file_ref.to_owned(),
                media_id: media_id.map(str::to_owned),
                property: property.as_str().to_owned(),
                value: value.to_owned(),
            });
        }
    }
    Ok(loaded)
}

/// Column positions resolved against the header row.
struct Columns<'a> {
    file: usize,
    mid: Option<usize>,
    values: Vec<(&'a PropertyId, usize)>,
}

impl<'a> Columns<'a> {
    fn locate(headers: &StringRecord, layout: &'a RowLayout) -> Result<Self, Vec<String>> {
        let position = |name: &str| headers.iter().position(|header| header == name);
        let mut missing = Vec::new();
        let file = position(&layout.file_column);
        if file.is_none() {
            missing.push(layout.file_column.clone());
        }
        let mut values = Vec::with_capacity(layout.mappings.len());
        for mapping in &layout.mappings {
            match position(&mapping.column) {
                Some(idx) => values.push((&mapping.property, idx)),
                None if missing.contains(&mapping.column) => {}
                None => missing.push(mapping.column.clone()),
            }
        }
        match file {
            Some(file) if missing.is_empty() => Ok(Self {
                file,
                mid: position(&layout.mid_column),
                values,
            }),
            _ => Err(missing),
        }
    }
}
