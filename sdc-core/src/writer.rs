//! Claim reading and idempotent claim writes.

use log::debug;

use crate::{
    ClaimSet, ClaimWriteError, FileTitle, ItemId, MediaId, OutcomeKind, PropertyId, SyncError,
    WriteStage, needs_write,
};

/// Read access to the item-valued statements of a subject.
pub trait ClaimReader {
    /// Fetch the values attached to `property` on `subject`.
    ///
    /// A subject without statements for the property yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] when the subject does not exist and
    /// any transport failure otherwise.
    fn read_claims(&self, subject: &MediaId, property: &PropertyId)
    -> Result<ClaimSet, SyncError>;

    /// Fetch claim sets for several subjects, preserving input order.
    ///
    /// The default issues one read per subject; adapters override it to
    /// batch. The result for each subject matches [`Self::read_claims`].
    fn read_claims_many(
        &self,
        subjects: &[MediaId],
        property: &PropertyId,
    ) -> Vec<(MediaId, Result<ClaimSet, SyncError>)> {
        subjects
            .iter()
            .map(|subject| (subject.clone(), self.read_claims(subject, property)))
            .collect()
    }
}

/// What a write should add and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimTarget {
    /// Subject receiving the statement.
    pub subject: MediaId,
    /// Statement property.
    pub property: PropertyId,
    /// Statement value.
    pub value: ItemId,
    /// File the subject was resolved from, used in edit summaries.
    pub file: Option<FileTitle>,
}

impl ClaimTarget {
    /// Human readable edit summary attached to the mutation.
    ///
    /// # Examples
    /// ```
    /// use sdc_core::{ClaimTarget, FileTitle, ItemId, MediaId, PropertyId};
    ///
    /// let target = ClaimTarget {
    ///     subject: MediaId::parse("M7")?,
    ///     property: PropertyId::new("P180")?,
    ///     value: ItemId::parse("Q146")?,
    ///     file: Some(FileTitle::parse("Cat.jpg")?),
    /// };
    /// assert_eq!(
    ///     target.edit_summary(),
    ///     "Add Q146 to P180 on M7 (= File:Cat.jpg) via Commons API",
    /// );
    /// # Ok::<(), sdc_core::IdError>(())
    /// ```
    #[must_use]
    pub fn edit_summary(&self) -> String {
        match &self.file {
            Some(file) => format!(
                "Add {} to {} on {} (= {}) via Commons API",
                self.value,
                self.property,
                self.subject,
                file.page_title()
            ),
            None => format!(
                "Add {} to {} on {} via Commons API",
                self.value, self.property, self.subject
            ),
        }
    }
}

/// Confirmation returned by a successful mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Claim GUID or revision id, when the service returned one.
    pub confirmation: Option<String>,
}

/// Mutating access used to add item-valued statements.
pub trait ClaimMutator {
    /// Issue exactly one "create claim" call.
    ///
    /// # Errors
    ///
    /// Returns whatever the transport raised, including
    /// [`SyncError::MissingEditToken`] when the session cannot edit.
    fn create_claim(&self, target: &ClaimTarget) -> Result<WriteReceipt, SyncError>;
}

/// Result of a successful [`write_claim`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The claim was created.
    Added {
        /// Confirmation token from the service.
        confirmation: Option<String>,
    },
    /// Simulate mode: the claim is missing and would be created.
    WouldAdd,
    /// The value is already present.
    SkippedDuplicate,
}

impl WriteOutcome {
    /// Outcome kind reported to the log.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Added { .. } => OutcomeKind::Added,
            Self::WouldAdd => OutcomeKind::WouldAdd,
            Self::SkippedDuplicate => OutcomeKind::SkippedDuplicate,
        }
    }
}

/// Add `target.value` to `target.property` on `target.subject` unless present.
///
/// The claim set is read fresh on every call. In simulate mode no mutating
/// call is issued.
///
/// # Errors
///
/// Returns [`ClaimWriteError`] carrying the triple when the read or the write
/// fails.
pub fn write_claim<S>(
    store: &S,
    target: &ClaimTarget,
    simulate: bool,
) -> Result<WriteOutcome, ClaimWriteError>
where
    S: ClaimReader + ClaimMutator + ?Sized,
{
    let wrap = move |stage: WriteStage| {
        move |source: SyncError| ClaimWriteError {
            subject: target.subject.clone(),
            property: target.property.clone(),
            value: target.value.clone(),
            stage,
            source,
        }
    };
    let existing = store
        .read_claims(&target.subject, &target.property)
        .map_err(wrap(WriteStage::Read))?;
    debug!(
        "{} {} has {} existing value(s): {:?}",
        target.subject,
        target.property,
        existing.len(),
        existing.values().iter().map(ItemId::as_str).collect::<Vec<_>>()
    );
    if !needs_write(&existing, &target.value) {
        return Ok(WriteOutcome::SkippedDuplicate);
    }
    if simulate {
        return Ok(WriteOutcome::WouldAdd);
    }
    let receipt = store
        .create_claim(target)
        .map_err(wrap(WriteStage::Create))?;
    Ok(WriteOutcome::Added {
        confirmation: receipt.confirmation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryCommons;
    use rstest::{fixture, rstest};

    #[fixture]
    fn target() -> ClaimTarget {
        ClaimTarget {
            subject: MediaId::parse("M10").expect("subject"),
            property: PropertyId::new("P180").expect("property"),
            value: ItemId::parse("Q146").expect("value"),
            file: None,
        }
    }

    #[rstest]
    fn second_write_is_a_duplicate(target: ClaimTarget) {
        let store = InMemoryCommons::new().with_subject(target.subject.clone());
        let first = write_claim(&store, &target, false).expect("first write");
        let second = write_claim(&store, &target, false).expect("second write");
        assert!(matches!(first, WriteOutcome::Added { confirmation: Some(_) }));
        assert_eq!(second, WriteOutcome::SkippedDuplicate);
        let stored = store
            .read_claims(&target.subject, &target.property)
            .expect("read back");
        assert_eq!(stored.len(), 1);
        assert_eq!(store.write_calls(), 1);
    }

    #[rstest]
    fn zero_padded_duplicate_is_not_written(target: ClaimTarget) {
        let store = InMemoryCommons::new().with_claim(
            &target.subject,
            &target.property,
            &ItemId::parse("Q146").expect("stored value"),
        );
        let padded = ClaimTarget {
            value: ItemId::parse("Q0146").expect("padded value"),
            ..target
        };
        let outcome = write_claim(&store, &padded, false).expect("write");
        assert_eq!(outcome, WriteOutcome::SkippedDuplicate);
        assert_eq!(store.write_calls(), 0);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn simulate_never_mutates(target: ClaimTarget, #[case] already_present: bool) {
        let mut store = InMemoryCommons::new().with_subject(target.subject.clone());
        if already_present {
            store = store.with_claim(&target.subject, &target.property, &target.value);
        }
        let outcome = write_claim(&store, &target, true).expect("simulated write");
        let expected = if already_present {
            WriteOutcome::SkippedDuplicate
        } else {
            WriteOutcome::WouldAdd
        };
        assert_eq!(outcome, expected);
        assert_eq!(store.write_calls(), 0);
        assert_eq!(store.read_calls(), 1);
    }

    #[rstest]
    fn missing_subject_is_reported_with_context(target: ClaimTarget) {
        let store = InMemoryCommons::new();
        let err = write_claim(&store, &target, false).expect_err("subject is missing");
        assert_eq!(err.subject, target.subject);
        assert_eq!(err.stage, WriteStage::Read);
        assert!(matches!(err.source, SyncError::NotFound { .. }));
    }

    #[rstest]
    fn write_failures_are_wrapped(target: ClaimTarget) {
        let store = InMemoryCommons::new()
            .with_subject(target.subject.clone())
            .failing_writes(SyncError::MissingEditToken);
        let err = write_claim(&store, &target, false).expect_err("write should fail");
        assert_eq!(err.source, SyncError::MissingEditToken);
        assert_eq!(err.stage, WriteStage::Create);
        assert_eq!(err.value, target.value);
    }
}
