//! Observed claim sets and the duplicate guard.

use crate::ItemId;

/// Ordered item values attached to one (subject, property) pair at read time.
///
/// Values keep the order the remote service returned them in. A claim set is
/// never cached across writes; callers re-read before every write attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    values: Vec<ItemId>,
}

impl ClaimSet {
    /// Create an empty claim set.
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Append an observed value.
    pub fn push(&mut self, value: ItemId) {
        self.values.push(value);
    }

    /// Observed values in remote order.
    #[must_use]
    pub fn values(&self) -> &[ItemId] {
        &self.values
    }

    /// Number of observed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the canonical form of `value` is already present.
    #[must_use]
    pub fn contains(&self, value: &ItemId) -> bool {
        self.values.iter().any(|existing| existing == value)
    }
}

impl FromIterator<ItemId> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a ItemId;
    type IntoIter = std::slice::Iter<'a, ItemId>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// Decide whether `candidate` still has to be written.
///
/// Comparison happens on the normalised item token, so `q42`, `Q042` and
/// `wd:Q42` are the same value.
///
/// # Examples
/// ```
/// use sdc_core::{ClaimSet, ItemId, needs_write};
///
/// let existing: ClaimSet = [ItemId::parse("Q42")?].into_iter().collect();
/// assert!(!needs_write(&existing, &ItemId::parse("q42")?));
/// assert!(needs_write(&existing, &ItemId::parse("Q7")?));
/// # Ok::<(), sdc_core::IdError>(())
/// ```
#[must_use]
pub fn needs_write(claims: &ClaimSet, candidate: &ItemId) -> bool {
    !claims.contains(candidate)
}
