//! Identifier newtypes for media entities, properties and items.
//!
//! Each constructor normalises the incoming token (case, common prefixes,
//! entity URLs) so that two spellings of the same identifier compare equal.

use std::fmt;

use thiserror::Error;

/// Errors raised when a token does not have the expected identifier shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The token was empty after trimming.
    #[error("{kind} must not be empty")]
    Empty {
        /// Human readable identifier kind.
        kind: &'static str,
    },
    /// The token did not match the identifier shape.
    #[error("invalid {kind} '{raw}'")]
    Malformed {
        /// Human readable identifier kind.
        kind: &'static str,
        /// Original input.
        raw: String,
    },
}

/// Canonical Commons media identifier (`M<digits>`), the Subject of a claim.
///
/// # Examples
/// ```
/// use sdc_core::MediaId;
///
/// let id = MediaId::parse("https://commons.wikimedia.org/entity/m109018409")?;
/// assert_eq!(id.as_str(), "M109018409");
/// assert_eq!(MediaId::from_page_id(42).as_str(), "M42");
/// # Ok::<(), sdc_core::IdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaId(String);

impl MediaId {
    /// Parse a media id from `M123`, `m123` or an entity URL ending in `/M123`.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        parse_prefixed(raw, 'M', "media id").map(Self)
    }

    /// Build the media id belonging to a file page.
    #[must_use]
    pub fn from_page_id(page_id: u64) -> Self {
        Self(format!("M{page_id}"))
    }

    /// Borrow the canonical token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digits of the file page id the media id was derived from.
    #[must_use]
    pub fn page_id(&self) -> &str {
        self.0.strip_prefix('M').unwrap_or(&self.0)
    }

    /// Entity URL on Commons, used in log messages and reports.
    #[must_use]
    pub fn entity_url(&self) -> String {
        format!("https://commons.wikimedia.org/entity/{}", self.0)
    }
}

/// Statement type identifier such as `P180` ("depicts").
///
/// The core treats properties as opaque: only emptiness is rejected here and
/// shape checks belong to whoever builds the configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(String);

impl PropertyId {
    /// Construct a property id from any non-empty token.
    pub fn new(raw: &str) -> Result<Self, IdError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty { kind: "property" });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Report whether the token has the `P<digits>` shape used by Wikibase.
    #[must_use]
    pub fn is_wikibase_shaped(&self) -> bool {
        parse_prefixed(&self.0, 'P', "property").is_ok_and(|canonical| canonical == self.0)
    }

    /// Borrow the token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Item identifier (`Q<digits>`), the only supported claim Value.
///
/// # Examples
/// ```
/// use sdc_core::ItemId;
///
/// let plain = ItemId::parse("Q42")?;
/// assert_eq!(ItemId::parse("q42")?, plain);
/// assert_eq!(ItemId::parse("http://www.wikidata.org/entity/Q42")?, plain);
/// assert_eq!(ItemId::parse("wd:Q42")?, plain);
/// assert_eq!(plain.numeric_id(), 42);
/// # Ok::<(), sdc_core::IdError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId {
    token: String,
    numeric: u64,
}

impl ItemId {
    /// Parse and normalise an item id.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let token = parse_prefixed(raw, 'Q', "item id")?;
        let numeric = token
            .get(1..)
            .and_then(|digits| digits.parse::<u64>().ok())
            .ok_or_else(|| IdError::Malformed {
                kind: "item id",
                raw: raw.to_owned(),
            })?;
        Ok(Self { token, numeric })
    }

    /// Borrow the canonical `Q<digits>` token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Numeric part of the identifier, as required by `wbcreateclaim`.
    #[must_use]
    pub const fn numeric_id(&self) -> u64 {
        self.numeric
    }

    /// Wikidata page URL for the item.
    #[must_use]
    pub fn wiki_url(&self) -> String {
        format!("https://www.wikidata.org/wiki/{}", self.token)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl AsRef<str> for $ty {
                fn as_ref(&self) -> &str {
                    self.as_str()
                }
            }
        )+
    };
}

display_as_str!(MediaId, PropertyId, ItemId);

/// Strip URL paths, `prefix:` namespaces, case and leading zeros from an
/// identifier token.
fn parse_prefixed(raw: &str, letter: char, kind: &'static str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    let without_fragment = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    let last_segment = without_fragment
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_fragment);
    let token = last_segment
        .rsplit(':')
        .next()
        .unwrap_or(last_segment)
        .trim();
    let malformed = || IdError::Malformed {
        kind,
        raw: raw.to_owned(),
    };
    let mut chars = token.chars();
    let head = chars.next().ok_or_else(malformed)?;
    if !head.eq_ignore_ascii_case(&letter) {
        return Err(malformed());
    }
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }
    let significant = digits.trim_start_matches('0');
    let canonical = if significant.is_empty() { "0" } else { significant };
    Ok(format!("{letter}{canonical}"))
}
