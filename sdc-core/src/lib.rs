//! Core synchronisation engine for Commons structured data.
//!
//! The crate is transport agnostic: every remote interaction goes through a
//! small trait ([`ClaimReader`], [`ClaimMutator`], [`TitleLookup`],
//! [`CategorySource`], [`LabelSource`]) so that adapters can speak HTTP while
//! tests use the in-memory doubles in `test_support`.
//!
//! Two flows are built on top:
//!
//! - the [`Driver`] writes item-valued claims row by row, skipping values that
//!   are already present and pacing real edits;
//! - [`extract_category`] walks a category and labels the values attached to
//!   each member.

mod category;
mod claims;
mod driver;
mod error;
mod extract;
mod file_ref;
mod ids;
mod labels;
mod outcome;
mod resolver;
mod writer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use category::{
    CategoryMember, CategoryName, CategoryPage, CategorySource, CategoryWalker, ContinuationToken,
};
pub use claims::{ClaimSet, needs_write};
pub use driver::{
    DEFAULT_PAUSE, Driver, DriverConfig, DriverReport, InputRow, Pacer, ThreadPacer,
    UNRESOLVED_DETAIL,
};
pub use error::{ClaimWriteError, ErrorClass, SyncError, WriteStage};
pub use extract::{ExtractRequest, ReportRecord, extract_category};
pub use file_ref::FileTitle;
pub use ids::{IdError, ItemId, MediaId, PropertyId};
pub use labels::{
    DEFAULT_LABEL_BATCH, FALLBACK_LANGUAGES, LabelEntry, LabelSource, LabelTable, LanguageChain,
    LanguageCode, resolve_labels,
};
pub use outcome::{Outcome, OutcomeKind, OutcomeSink, OutcomeTally, SinkError};
pub use resolver::{IdentifierResolver, InvalidRef, Resolved, TitleLookup};
pub use writer::{
    ClaimMutator, ClaimReader, ClaimTarget, WriteOutcome, WriteReceipt, write_claim,
};
