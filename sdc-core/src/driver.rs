//! Sequential, paced execution of claim-write rows.
//!
//! The [`Driver`] processes one row at a time: validate, resolve the subject,
//! read the current claims, decide, and write. Each row produces exactly one
//! [`Outcome`], streamed to an [`OutcomeSink`] as soon as it exists. A fixed
//! pause follows every row that issued a mutating call, whether or not it
//! succeeded, and an optional cap bounds the number of Added/WouldAdd
//! outcomes; rows after the cap are reported as
//! [`OutcomeKind::SkippedCap`] without touching the network.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use log::{info, warn};

use crate::{
    ClaimMutator, ClaimReader, ClaimTarget, IdentifierResolver, ItemId, MediaId, Outcome,
    OutcomeKind, OutcomeSink, OutcomeTally, PropertyId, SinkError, TitleLookup, WriteOutcome,
    WriteStage, write_claim,
};

/// Default pause after each attempted edit.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// Detail reported when a row has no usable subject.
pub const UNRESOLVED_DETAIL: &str =
    "Missing/invalid media id and could not resolve from file reference";

/// Immutable settings for a driver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Pause inserted after each row that issued a mutating call.
    pub pause: Duration,
    /// Maximum number of Added/WouldAdd outcomes.
    pub max_ops: Option<usize>,
    /// When set, no mutating call is issued.
    pub simulate: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            pause: DEFAULT_PAUSE,
            max_ops: None,
            simulate: true,
        }
    }
}

impl DriverConfig {
    /// Set the pause after created claims.
    #[must_use]
    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Cap the number of Added/WouldAdd outcomes.
    #[must_use]
    pub const fn with_max_ops(mut self, max_ops: Option<usize>) -> Self {
        self.max_ops = max_ops;
        self
    }

    /// Toggle simulate mode.
    #[must_use]
    pub const fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }
}

/// Courtesy pacing between mutating operations.
pub trait Pacer {
    /// Block for `duration`.
    fn pause(&self, duration: Duration);
}

/// [`Pacer`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// One input row as supplied by the tabular reader.
///
/// Fields hold the raw cell text and are validated by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    /// File reference in any accepted form.
    pub file_ref: String,
    /// Pre-resolved media id, if the input had one.
    pub media_id: Option<String>,
    /// Property token.
    pub property: String,
    /// Value token.
    pub value: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    /// Outcomes in row order.
    pub outcomes: Vec<Outcome>,
    /// Counts by kind.
    pub tally: OutcomeTally,
}

/// Runs rows against a remote store one at a time.
#[derive(Debug)]
pub struct Driver<'a, S: ?Sized, P: ?Sized> {
    store: &'a S,
    pacer: &'a P,
    config: DriverConfig,
}

impl<'a, S, P> Driver<'a, S, P>
where
    S: ClaimReader + ClaimMutator + TitleLookup + ?Sized,
    P: Pacer + ?Sized,
{
    /// Create a driver over `store`.
    pub const fn new(store: &'a S, pacer: &'a P, config: DriverConfig) -> Self {
        Self {
            store,
            pacer,
            config,
        }
    }

    /// Process every row and stream the outcomes into `sink`.
    ///
    /// Row failures never stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when an outcome cannot be recorded; the run stops
    /// at that point.
    pub fn run<I, K>(&self, rows: I, sink: &mut K) -> Result<DriverReport, SinkError>
    where
        I: IntoIterator<Item = InputRow>,
        K: OutcomeSink + ?Sized,
    {
        let mut resolver = IdentifierResolver::new(self.store);
        let mut report = DriverReport::default();
        let mut counted = 0_usize;
        for row in rows {
            let (outcome, mutated) = if self.config.max_ops.is_some_and(|cap| counted >= cap) {
                let capped = self
                    .outcome(&row, None, OutcomeKind::SkippedCap)
                    .with_detail(format!(
                        "Operation cap of {} reached",
                        self.config.max_ops.unwrap_or_default()
                    ));
                (capped, false)
            } else {
                self.process(&mut resolver, &row)
            };
            if outcome.kind.counts_towards_cap() {
                counted += 1;
            }
            log_outcome(&outcome);
            sink.record(&outcome)?;
            if mutated {
                self.pacer.pause(self.config.pause);
            }
            report.tally.record(outcome.kind);
            report.outcomes.push(outcome);
        }
        sink.flush()?;
        Ok(report)
    }

    /// Produce the outcome of one row and whether a mutating call was issued.
    fn process(
        &self,
        resolver: &mut IdentifierResolver<'_, S>,
        row: &InputRow,
    ) -> (Outcome, bool) {
        let Ok(property) = PropertyId::new(&row.property) else {
            let invalid = self
                .outcome(row, None, OutcomeKind::SkippedInvalid)
                .with_detail(format!("Invalid property '{}'", row.property));
            return (invalid, false);
        };
        let Ok(value) = ItemId::parse(&row.value) else {
            let invalid = self
                .outcome(row, None, OutcomeKind::SkippedInvalid)
                .with_detail(format!("Invalid item id '{}'", row.value));
            return (invalid, false);
        };
        let resolved = match resolver.resolve(&row.file_ref, row.media_id.as_deref()) {
            Ok(resolved) => resolved,
            Err(err) => {
                let invalid = self
                    .outcome(row, None, OutcomeKind::SkippedInvalid)
                    .with_detail(format!("{UNRESOLVED_DETAIL} ({err})"));
                return (invalid, false);
            }
        };
        let target = ClaimTarget {
            subject: resolved.subject,
            property,
            value,
            file: resolved.title,
        };
        let subject = Some(target.subject.clone());
        match write_claim(self.store, &target, self.config.simulate) {
            Ok(WriteOutcome::Added { confirmation }) => {
                let mut outcome = self.outcome(row, subject, OutcomeKind::Added);
                outcome.confirmation = confirmation;
                (outcome, true)
            }
            Ok(WriteOutcome::WouldAdd) => {
                let outcome = self
                    .outcome(row, subject, OutcomeKind::WouldAdd)
                    .with_detail("Simulate mode: claim not written");
                (outcome, false)
            }
            Ok(WriteOutcome::SkippedDuplicate) => {
                let outcome = self
                    .outcome(row, subject, OutcomeKind::SkippedDuplicate)
                    .with_detail("Value already present");
                (outcome, false)
            }
            Err(err) => {
                let mutated = err.stage == WriteStage::Create;
                let outcome = self
                    .outcome(row, subject, OutcomeKind::Error)
                    .with_detail(err.to_string());
                (outcome, mutated)
            }
        }
    }

    fn outcome(&self, row: &InputRow, subject: Option<MediaId>, kind: OutcomeKind) -> Outcome {
        Outcome {
            timestamp: Utc::now(),
            subject,
            file_ref: row.file_ref.clone(),
            property: row.property.clone(),
            value: row.value.clone(),
            kind,
            detail: String::new(),
            confirmation: None,
            simulate: self.config.simulate,
        }
    }
}

impl Outcome {
    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

fn log_outcome(outcome: &Outcome) {
    let subject = outcome.subject.as_ref().map_or("-", MediaId::as_str);
    let message = format!(
        "{} {subject} {} {} ({})",
        outcome.kind, outcome.property, outcome.value, outcome.file_ref
    );
    match outcome.kind {
        OutcomeKind::Error | OutcomeKind::SkippedInvalid => {
            warn!("{message}: {}", outcome.detail);
        }
        _ => info!("{message}"),
    }
}
