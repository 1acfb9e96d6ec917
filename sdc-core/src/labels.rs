//! Batched label resolution with a language fallback chain.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::{IdError, ItemId, SyncError};

/// Default batch size accepted by Wikibase `wbgetentities`.
pub const DEFAULT_LABEL_BATCH: usize = 50;

/// Fallback languages appended after the preferred one.
pub const FALLBACK_LANGUAGES: [&str; 3] = ["en", "de", "fr"];

/// Lower-cased language code such as `nl` or `pt-br`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Validate and normalise a language code.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] when the code is empty or contains characters
    /// other than ASCII letters, digits and `-`.
    pub fn new(raw: &str) -> Result<Self, IdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty { kind: "language" });
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(IdError::Malformed {
                kind: "language",
                raw: raw.to_owned(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Borrow the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, duplicate-free list of languages to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChain(Vec<LanguageCode>);

impl LanguageChain {
    /// Build a chain, keeping the first occurrence of each code.
    #[must_use]
    pub fn new(codes: impl IntoIterator<Item = LanguageCode>) -> Self {
        let mut chain: Vec<LanguageCode> = Vec::new();
        for code in codes {
            if !chain.contains(&code) {
                chain.push(code);
            }
        }
        Self(chain)
    }

    /// `preferred` followed by [`FALLBACK_LANGUAGES`].
    ///
    /// # Examples
    /// ```
    /// use sdc_core::{LanguageChain, LanguageCode};
    ///
    /// let chain = LanguageChain::with_fallbacks(LanguageCode::new("de")?);
    /// let codes: Vec<&str> = chain.codes().iter().map(LanguageCode::as_str).collect();
    /// assert_eq!(codes, ["de", "en", "fr"]);
    /// # Ok::<(), sdc_core::IdError>(())
    /// ```
    #[must_use]
    pub fn with_fallbacks(preferred: LanguageCode) -> Self {
        let fallbacks = FALLBACK_LANGUAGES
            .iter()
            .map(|code| LanguageCode((*code).to_owned()));
        Self::new(std::iter::once(preferred).chain(fallbacks))
    }

    /// Codes in priority order.
    #[must_use]
    pub fn codes(&self) -> &[LanguageCode] {
        &self.0
    }

    /// Codes joined with `|` for API requests.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(LanguageCode::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Resolved label for one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    /// Value the label belongs to.
    pub value: ItemId,
    /// Label text, or the bare identifier when nothing resolved.
    pub label: String,
    /// Language the label was found in.
    pub language: Option<LanguageCode>,
}

impl fmt::Display for LabelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.value.wiki_url())
    }
}

/// Labels per value per language, as returned by a [`LabelSource`].
pub type LabelTable = BTreeMap<ItemId, BTreeMap<LanguageCode, String>>;

/// Remote endpoint returning labels for a batch of values.
pub trait LabelSource {
    /// Largest batch accepted per call.
    fn max_batch(&self) -> usize {
        DEFAULT_LABEL_BATCH
    }

    /// Fetch labels in the chain's languages for one batch.
    ///
    /// Values without an entity or label are simply absent from the table.
    ///
    /// # Errors
    ///
    /// Returns the transport failure for the batch.
    fn fetch_labels(
        &self,
        values: &[ItemId],
        chain: &LanguageChain,
    ) -> Result<LabelTable, SyncError>;
}

/// Resolve labels for `values`, one remote call per batch.
///
/// Values are de-duplicated and sorted before batching, so the result does
/// not depend on the batch size.
///
/// # Errors
///
/// Returns the first batch failure.
pub fn resolve_labels<S>(
    source: &S,
    values: &[ItemId],
    chain: &LanguageChain,
) -> Result<BTreeMap<ItemId, LabelEntry>, SyncError>
where
    S: LabelSource + ?Sized,
{
    let distinct: Vec<ItemId> = values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut table = LabelTable::new();
    for batch in distinct.chunks(source.max_batch().max(1)) {
        debug!("fetching labels for {} value(s)", batch.len());
        table.extend(source.fetch_labels(batch, chain)?);
    }
    Ok(distinct
        .into_iter()
        .map(|value| {
            let entry = pick_label(&value, table.get(&value), chain);
            (value, entry)
        })
        .collect())
}

fn pick_label(
    value: &ItemId,
    labels: Option<&BTreeMap<LanguageCode, String>>,
    chain: &LanguageChain,
) -> LabelEntry {
    let found = labels.and_then(|by_language| {
        chain
            .codes()
            .iter()
            .find_map(|code| by_language.get(code).map(|label| (code, label)))
    });
    match found {
        Some((code, label)) => LabelEntry {
            value: value.clone(),
            label: label.clone(),
            language: Some(code.clone()),
        },
        None => LabelEntry {
            value: value.clone(),
            label: value.as_str().to_owned(),
            language: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryLabels;
    use rstest::{fixture, rstest};

    fn item(raw: &str) -> ItemId {
        ItemId::parse(raw).expect("item")
    }

    fn lang(raw: &str) -> LanguageCode {
        LanguageCode::new(raw).expect("language")
    }

    fn sample_labels() -> InMemoryLabels {
        InMemoryLabels::new()
            .with_label("Q1", "en", "universe")
            .with_label("Q1", "nl", "heelal")
            .with_label("Q146", "en", "house cat")
            .with_label("Q146", "de", "Hauskatze")
            .with_label("Q2", "fr", "Terre")
    }

    #[fixture]
    fn labels() -> InMemoryLabels {
        sample_labels()
    }

    #[fixture]
    fn dutch_first() -> LanguageChain {
        LanguageChain::new([lang("nl"), lang("en"), lang("de")])
    }

    #[rstest]
    #[case("Q1", "heelal", Some("nl"))]
    #[case("Q146", "house cat", Some("en"))]
    #[case("Q2", "Q2", None)]
    #[case("Q999", "Q999", None)]
    fn first_language_in_chain_wins(
        labels: InMemoryLabels,
        dutch_first: LanguageChain,
        #[case] value: &str,
        #[case] label: &str,
        #[case] language: Option<&str>,
    ) {
        let resolved = resolve_labels(&labels, &[item(value)], &dutch_first).expect("labels");
        let entry = resolved.get(&item(value)).expect("entry present");
        assert_eq!(entry.label, label);
        assert_eq!(entry.language.as_ref().map(LanguageCode::as_str), language);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(50)]
    fn batch_size_does_not_change_the_result(dutch_first: LanguageChain, #[case] batch: usize) {
        let values = [item("Q2"), item("Q1"), item("Q146"), item("Q1")];
        let reference =
            resolve_labels(&sample_labels(), &values, &dutch_first).expect("reference labels");
        let batched = sample_labels().with_max_batch(batch);
        let resolved = resolve_labels(&batched, &values, &dutch_first).expect("batched labels");
        assert_eq!(resolved, reference);
        assert_eq!(resolved.len(), 3);
        assert_eq!(batched.calls(), 3_usize.div_ceil(batch));
    }

    #[rstest]
    fn chain_removes_duplicates() {
        let chain = LanguageChain::with_fallbacks(lang("EN"));
        assert_eq!(chain.joined(), "en|de|fr");
    }

    #[rstest]
    #[case("")]
    #[case("en gb")]
    fn invalid_language_codes_are_rejected(#[case] raw: &str) {
        assert!(LanguageCode::new(raw).is_err());
    }
}
