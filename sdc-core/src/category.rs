//! Paginated walks over category members.
//!
//! [`CategoryWalker`] drives a [`CategorySource`] page by page, following the
//! opaque continuation token until the listing ends or a member limit is hit.
//! The walk is lazy: a page is fetched only once the previous one has been
//! consumed.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use log::debug;

use crate::{FileTitle, IdError, MediaId, SyncError};

/// Category name stored without the `Category:` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Parse `Category:Foo_bar`, `category:Foo bar` or `Foo bar`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] when no name remains.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let trimmed = raw.trim();
        let name = trimmed
            .get(..9)
            .filter(|head| head.eq_ignore_ascii_case("category:"))
            .and_then(|_| trimmed.get(9..))
            .unwrap_or(trimmed)
            .replace('_', " ");
        let cleaned = name.trim();
        if cleaned.is_empty() {
            return Err(IdError::Empty { kind: "category" });
        }
        Ok(Self(cleaned.to_owned()))
    }

    /// Name without the namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Full page title including the namespace.
    #[must_use]
    pub fn page_title(&self) -> String {
        format!("Category:{}", self.0)
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file discovered while walking a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMember {
    /// Media id of the file.
    pub subject: MediaId,
    /// Title of the file page.
    pub title: FileTitle,
}

/// Opaque cursor returned by a paginated listing.
///
/// The pairs are echoed back verbatim on the next request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuationToken(BTreeMap<String, String>);

impl ContinuationToken {
    /// Wrap the parameters returned by the service.
    #[must_use]
    pub const fn new(params: BTreeMap<String, String>) -> Self {
        Self(params)
    }

    /// Parameters to send with the next request.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ContinuationToken {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// One page of a category listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPage {
    /// Members in listing order.
    pub members: Vec<CategoryMember>,
    /// Cursor for the next page, absent on the last page.
    pub next: Option<ContinuationToken>,
}

/// Remote listing endpoint for category members.
pub trait CategorySource {
    /// Fetch the page starting at `token`, or the first page when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] for a missing category and any
    /// transport failure otherwise.
    fn fetch_page(
        &self,
        category: &CategoryName,
        token: Option<&ContinuationToken>,
    ) -> Result<CategoryPage, SyncError>;
}

/// Lazy iterator over every member of a category.
///
/// A failed page fetch is yielded once as `Err` and ends the walk.
///
/// # Examples
/// ```
/// use sdc_core::{
///     CategoryMember, CategoryName, CategoryPage, CategorySource, CategoryWalker, FileTitle,
///     MediaId, SyncError,
/// };
/// use sdc_core::ContinuationToken;
///
/// struct TwoPages;
///
/// impl CategorySource for TwoPages {
///     fn fetch_page(
///         &self,
///         _category: &CategoryName,
///         token: Option<&ContinuationToken>,
///     ) -> Result<CategoryPage, SyncError> {
///         let (id, next) = match token {
///             None => (1, Some([("gcmcontinue", "page|2")].into_iter().collect())),
///             Some(_) => (2, None),
///         };
///         let member = CategoryMember {
///             subject: MediaId::from_page_id(id),
///             title: FileTitle::parse(&format!("{id}.jpg")).expect("valid title"),
///         };
///         Ok(CategoryPage { members: vec![member], next })
///     }
/// }
///
/// let category = CategoryName::parse("Category:Tulips")?;
/// let walked: Vec<_> = CategoryWalker::new(&TwoPages, &category, None)
///     .collect::<Result<_, _>>()?;
/// assert_eq!(walked.len(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct CategoryWalker<'a, S: ?Sized> {
    source: &'a S,
    category: &'a CategoryName,
    limit: Option<usize>,
    buffered: VecDeque<CategoryMember>,
    next: Option<ContinuationToken>,
    pages: usize,
    yielded: usize,
    finished: bool,
}

impl<'a, S> CategoryWalker<'a, S>
where
    S: CategorySource + ?Sized,
{
    /// Start a walk, optionally stopping after `limit` members.
    pub const fn new(source: &'a S, category: &'a CategoryName, limit: Option<usize>) -> Self {
        Self {
            source,
            category,
            limit,
            buffered: VecDeque::new(),
            next: None,
            pages: 0,
            yielded: 0,
            finished: false,
        }
    }

    /// Number of pages requested so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.pages
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }
}

impl<S> Iterator for CategoryWalker<'_, S>
where
    S: CategorySource + ?Sized,
{
    type Item = Result<CategoryMember, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished || self.limit_reached() {
                self.finished = true;
                return None;
            }
            if let Some(member) = self.buffered.pop_front() {
                self.yielded += 1;
                return Some(Ok(member));
            }
            if self.pages > 0 && self.next.is_none() {
                self.finished = true;
                return None;
            }
            let page = match self.source.fetch_page(self.category, self.next.as_ref()) {
                Ok(page) => page,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };
            self.pages += 1;
            debug!(
                "{} page {}: {} member(s), more: {}",
                self.category.page_title(),
                self.pages,
                page.members.len(),
                page.next.is_some()
            );
            self.buffered.extend(page.members);
            self.next = page.next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::InMemoryCommons;
    use rstest::{fixture, rstest};

    #[fixture]
    fn category() -> CategoryName {
        CategoryName::parse("Tulips").expect("category")
    }

    #[fixture]
    fn three_pages() -> InMemoryCommons {
        InMemoryCommons::new().with_category_pages(
            "Tulips",
            vec![
                vec![("A.jpg", 1), ("B.jpg", 2)],
                vec![("C.jpg", 3), ("D.jpg", 4)],
                vec![("E.jpg", 5)],
            ],
        )
    }

    #[rstest]
    fn walks_every_page_in_order(three_pages: InMemoryCommons, category: CategoryName) {
        let mut walker = CategoryWalker::new(&three_pages, &category, None);
        let ids: Vec<String> = walker
            .by_ref()
            .map(|member| member.expect("member").subject.to_string())
            .collect();
        assert_eq!(ids, ["M1", "M2", "M3", "M4", "M5"]);
        assert_eq!(walker.pages_fetched(), 3);
        assert_eq!(three_pages.page_calls(), 3);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(3, 2)]
    fn limit_stops_fetching_early(
        three_pages: InMemoryCommons,
        category: CategoryName,
        #[case] limit: usize,
        #[case] pages: usize,
    ) {
        let walked = CategoryWalker::new(&three_pages, &category, Some(limit)).count();
        assert_eq!(walked, limit);
        assert_eq!(three_pages.page_calls(), pages);
    }

    #[rstest]
    fn missing_category_yields_one_error(category: CategoryName) {
        let commons = InMemoryCommons::new();
        let results: Vec<_> = CategoryWalker::new(&commons, &category, None).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results.first(),
            Some(Err(SyncError::NotFound { .. }))
        ));
    }

    #[rstest]
    #[case("Category:Tulips_in_Holland")]
    #[case("category:Tulips in Holland")]
    #[case(" Tulips in Holland ")]
    fn category_names_drop_namespace(#[case] raw: &str) {
        let name = CategoryName::parse(raw).expect("category");
        assert_eq!(name.page_title(), "Category:Tulips in Holland");
    }
}
