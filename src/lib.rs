//! Facade crate for the Commons structured-data synchroniser.
//!
//! This crate re-exports the core domain types and flows and, behind the
//! default `http` feature, the MediaWiki API adapters.

#![forbid(unsafe_code)]

pub use sdc_core::{
    CategoryMember, CategoryName, CategorySource, ClaimMutator, ClaimReader, ClaimSet, Driver,
    DriverConfig, DriverReport, ErrorClass, ExtractRequest, FileTitle, InputRow, ItemId,
    LabelEntry, LabelSource, LanguageChain, LanguageCode, MediaId, Outcome, OutcomeKind,
    OutcomeSink, OutcomeTally, Pacer, PropertyId, ReportRecord, SyncError, ThreadPacer,
    TitleLookup, extract_category,
};

#[cfg(feature = "http")]
pub use sdc_data::{
    CommonsClient, Credentials, HttpBackend, ResilientTransport, RetryPolicy, Session,
    TransportBuildError, TransportConfig, WikidataLabels,
};
