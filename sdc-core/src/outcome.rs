//! Per-operation outcomes and the sink that records them.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::MediaId;

/// Classification of one attempted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// The claim was created.
    Added,
    /// Simulate mode: the claim would have been created.
    WouldAdd,
    /// The value was already present.
    SkippedDuplicate,
    /// The row was rejected before any write.
    SkippedInvalid,
    /// The operation cap was reached before this row.
    SkippedCap,
    /// The operation failed.
    Error,
}

impl OutcomeKind {
    /// Label written to outcome logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::WouldAdd => "WOULD_ADD",
            Self::SkippedDuplicate => "SKIPPED_DUPLICATE",
            Self::SkippedInvalid => "SKIPPED_INVALID",
            Self::SkippedCap => "SKIPPED_CAP",
            Self::Error => "ERROR",
        }
    }

    /// Whether the outcome counts towards the operation cap.
    #[must_use]
    pub const fn counts_towards_cap(self) -> bool {
        matches!(self, Self::Added | Self::WouldAdd)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one attempted (subject, property, value) operation.
///
/// Property and value are kept as the supplied text so that rows rejected
/// for malformed input can still be reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// When the outcome was produced.
    pub timestamp: DateTime<Utc>,
    /// Resolved subject, absent when resolution failed.
    pub subject: Option<MediaId>,
    /// File reference as supplied by the input row.
    pub file_ref: String,
    /// Property token.
    pub property: String,
    /// Value token.
    pub value: String,
    /// Classification.
    pub kind: OutcomeKind,
    /// Diagnostic detail, empty when there is nothing to add.
    pub detail: String,
    /// Revision or claim identifier returned by a successful write.
    pub confirmation: Option<String>,
    /// Whether the run was in simulate mode.
    pub simulate: bool,
}

/// Failure to persist an outcome.
#[derive(Debug, Error)]
#[error("failed to record outcome: {message}")]
pub struct SinkError {
    /// Description of the failure.
    pub message: String,
}

impl SinkError {
    /// Wrap any displayable failure.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Consumer of outcomes as they are produced, typically an audit log.
pub trait OutcomeSink {
    /// Persist a single outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the outcome cannot be recorded.
    fn record(&mut self, outcome: &Outcome) -> Result<(), SinkError>;

    /// Flush buffered records. The default does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when buffered records cannot be written.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: OutcomeSink + ?Sized> OutcomeSink for &mut S {
    fn record(&mut self, outcome: &Outcome) -> Result<(), SinkError> {
        (**self).record(outcome)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}

/// Counts of outcomes by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    /// Claims created.
    pub added: usize,
    /// Claims that would have been created.
    pub would_add: usize,
    /// Values already present.
    pub skipped_duplicate: usize,
    /// Rows rejected as invalid.
    pub skipped_invalid: usize,
    /// Rows skipped after the cap.
    pub skipped_cap: usize,
    /// Failed operations.
    pub errors: usize,
}

impl OutcomeTally {
    /// Count one outcome.
    pub const fn record(&mut self, kind: OutcomeKind) {
        let slot = match kind {
            OutcomeKind::Added => &mut self.added,
            OutcomeKind::WouldAdd => &mut self.would_add,
            OutcomeKind::SkippedDuplicate => &mut self.skipped_duplicate,
            OutcomeKind::SkippedInvalid => &mut self.skipped_invalid,
            OutcomeKind::SkippedCap => &mut self.skipped_cap,
            OutcomeKind::Error => &mut self.errors,
        };
        *slot += 1;
    }

    /// Total number of outcomes counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added
            + self.would_add
            + self.skipped_duplicate
            + self.skipped_invalid
            + self.skipped_cap
            + self.errors
    }
}

impl<'a> FromIterator<&'a Outcome> for OutcomeTally {
    fn from_iter<I: IntoIterator<Item = &'a Outcome>>(iter: I) -> Self {
        let mut tally = Self::default();
        for outcome in iter {
            tally.record(outcome.kind);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OutcomeKind::Added, "ADDED", true)]
    #[case(OutcomeKind::WouldAdd, "WOULD_ADD", true)]
    #[case(OutcomeKind::SkippedDuplicate, "SKIPPED_DUPLICATE", false)]
    #[case(OutcomeKind::SkippedInvalid, "SKIPPED_INVALID", false)]
    #[case(OutcomeKind::SkippedCap, "SKIPPED_CAP", false)]
    #[case(OutcomeKind::Error, "ERROR", false)]
    fn kinds_have_stable_labels(
        #[case] kind: OutcomeKind,
        #[case] label: &str,
        #[case] capped: bool,
    ) {
        assert_eq!(kind.to_string(), label);
        assert_eq!(kind.counts_towards_cap(), capped);
    }

    #[rstest]
    fn tally_counts_each_kind() {
        let mut tally = OutcomeTally::default();
        for kind in [
            OutcomeKind::Added,
            OutcomeKind::Added,
            OutcomeKind::Error,
            OutcomeKind::SkippedCap,
        ] {
            tally.record(kind);
        }
        assert_eq!(tally.added, 2);
        assert_eq!(tally.errors, 1);
        assert_eq!(tally.skipped_cap, 1);
        assert_eq!(tally.total(), 4);
    }
}
