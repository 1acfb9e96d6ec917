//! The `extract` subcommand: report the values attached to a category's files.

use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Local;
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use sdc_core::{
    CategoryName, CategorySource, ClaimReader, ExtractRequest, IdError, LabelSource,
    LanguageChain, LanguageCode, PropertyId, ReportRecord, extract_category,
};
use sdc_data::{CommonsClient, ResilientTransport, Session, TransportConfig, WikidataLabels};
use serde::{Deserialize, Serialize};

use crate::report;
use crate::transport::TransportOptions;
use crate::{
    ARG_COMMONS_API, ARG_EXTRACT_CATEGORY, ARG_EXTRACT_LANGUAGE, ARG_EXTRACT_LIMIT,
    ARG_EXTRACT_OUTPUT, ARG_EXTRACT_PROPERTY, ARG_MAX_ATTEMPTS, ARG_TIMEOUT_SECS, ARG_USER_AGENT,
    ARG_WIKIDATA_API, CliError, ENV_EXTRACT_CATEGORY, ENV_EXTRACT_USER_AGENT,
};

pub(crate) const DEFAULT_PROPERTY: &str = "P180";
pub(crate) const DEFAULT_LANGUAGE: &str = "nl";

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "extract",
    long_about = "Walk a Commons category, read the item values of one \
                 property (P180 \"depicts\" by default) for every file and \
                 write them, labelled, to a ^^^^-delimited report.",
    about = "Report the values attached to a category's files"
)]
#[ortho_config(prefix = "SDC")]
pub(crate) struct ExtractArgs {
    /// Category to walk, with or without the `Category:` prefix.
    #[arg(long = ARG_EXTRACT_CATEGORY, value_name = "name")]
    #[serde(default)]
    pub(crate) category: Option<String>,
    /// Property whose values are reported (default P180).
    #[arg(long = ARG_EXTRACT_PROPERTY, value_name = "pid")]
    #[serde(default)]
    pub(crate) property: Option<String>,
    /// Preferred label language; en, de and fr follow as fallbacks (default nl).
    #[arg(long = ARG_EXTRACT_LANGUAGE, value_name = "code")]
    #[serde(default)]
    pub(crate) language: Option<String>,
    /// Stop after this many files.
    #[arg(long = ARG_EXTRACT_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    /// Report path (default `<Category>_thingsdepicted_<LANG>_<ddmmyyyy>.csv`).
    #[arg(long = ARG_EXTRACT_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// User agent sent with every request, with contact details.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Commons API endpoint.
    #[arg(long = ARG_COMMONS_API, value_name = "url")]
    #[serde(default)]
    pub(crate) commons_api: Option<String>,
    /// Wikidata API endpoint.
    #[arg(long = ARG_WIKIDATA_API, value_name = "url")]
    #[serde(default)]
    pub(crate) wikidata_api: Option<String>,
    /// Attempts per request before giving up (default 5).
    #[arg(long = ARG_MAX_ATTEMPTS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
    /// Per-request timeout in seconds (default 30).
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
}

impl ExtractArgs {
    fn into_config(self) -> Result<ExtractConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractConfig::try_from(merged)
    }
}

/// Resolved `extract` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct ExtractConfig {
    pub(crate) request: ExtractRequest,
    /// Preferred label language, used in the default report name.
    pub(crate) language: LanguageCode,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) transport: TransportConfig,
}

impl ExtractConfig {
    /// Report path, derived from the category when none was given.
    pub(crate) fn output_path(&self) -> Utf8PathBuf {
        self.output.clone().unwrap_or_else(|| {
            Utf8PathBuf::from(report::default_report_name(
                &self.request.category,
                &self.language,
                Local::now().date_naive(),
            ))
        })
    }
}

impl TryFrom<ExtractArgs> for ExtractConfig {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let raw_category = args.category.ok_or(CliError::MissingArgument {
            field: ARG_EXTRACT_CATEGORY,
            env: ENV_EXTRACT_CATEGORY,
        })?;
        let category = CategoryName::parse(&raw_category).map_err(|source| {
            CliError::InvalidArgument {
                field: ARG_EXTRACT_CATEGORY,
                source,
            }
        })?;
        let property = parse_property(args.property.as_deref().unwrap_or(DEFAULT_PROPERTY))
            .map_err(|source| CliError::InvalidArgument {
                field: ARG_EXTRACT_PROPERTY,
                source,
            })?;
        let language = LanguageCode::new(args.language.as_deref().unwrap_or(DEFAULT_LANGUAGE))
            .map_err(|source| CliError::InvalidArgument {
                field: ARG_EXTRACT_LANGUAGE,
                source,
            })?;
        let transport = TransportOptions {
            user_agent: args.user_agent,
            commons_api: args.commons_api,
            wikidata_api: args.wikidata_api,
            max_attempts: args.max_attempts,
            timeout_secs: args.timeout_secs,
        }
        .into_config(ENV_EXTRACT_USER_AGENT)?;
        Ok(Self {
            request: ExtractRequest {
                category,
                property,
                chain: LanguageChain::with_fallbacks(language.clone()),
                limit: args.limit,
            },
            language,
            output: args.output,
            transport,
        })
    }
}

fn parse_property(raw: &str) -> Result<PropertyId, IdError> {
    let property = PropertyId::new(raw)?;
    if property.is_wikibase_shaped() {
        Ok(property)
    } else {
        Err(IdError::Malformed {
            kind: "property",
            raw: raw.to_owned(),
        })
    }
}

pub(super) fn run_extract(args: ExtractArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let transport = ResilientTransport::connect(&config.transport)?;
    let commons = CommonsClient::new(&transport, Session::anonymous());
    let labels = WikidataLabels::new(&transport);
    let output = config.output_path();
    let records = extract_to(&commons, &labels, &config.request, &output)?;
    echo_report(std::io::stdout().lock(), &records)?;
    info!("{} file(s) written to {output}", records.len());
    Ok(())
}

/// Print the report rows, header first, to `writer`.
pub(super) fn echo_report<W: Write>(
    writer: W,
    records: &[ReportRecord],
) -> Result<(), CliError> {
    report::write_report(writer, records).map_err(CliError::PrintReport)
}

/// Extract `request`, write the report to `output` and return its records.
///
/// Nothing is written when the extraction fails.
pub(super) fn extract_to<C, L>(
    commons: &C,
    labels: &L,
    request: &ExtractRequest,
    output: &Utf8Path,
) -> Result<Vec<ReportRecord>, CliError>
where
    C: CategorySource + ClaimReader + ?Sized,
    L: LabelSource + ?Sized,
{
    let records: Vec<ReportRecord> = extract_category(commons, labels, request)?;
    let file = sdc_fs::create_output(output).map_err(|source| CliError::CreateOutput {
        path: output.to_path_buf(),
        source,
    })?;
    report::write_report(BufWriter::new(file), &records).map_err(|source| {
        CliError::WriteReport {
            path: output.to_path_buf(),
            source,
        }
    })?;
    Ok(records)
}
