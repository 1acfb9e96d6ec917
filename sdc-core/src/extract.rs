//! Category extraction: members, their claims and labelled values.

use std::collections::HashMap;

use log::{info, warn};

use crate::{
    CategoryName, CategorySource, CategoryWalker, ClaimReader, ClaimSet, FileTitle, LabelEntry,
    LabelSource, LanguageChain, MediaId, PropertyId, SyncError, resolve_labels,
};

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    /// Category to walk.
    pub category: CategoryName,
    /// Property whose values are reported.
    pub property: PropertyId,
    /// Label languages in priority order.
    pub chain: LanguageChain,
    /// Stop after this many members.
    pub limit: Option<usize>,
}

/// One line of the extraction report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    /// Media id of the file.
    pub subject: MediaId,
    /// File title.
    pub title: FileTitle,
    /// Values in claim order with their labels.
    pub values: Vec<LabelEntry>,
}

impl ReportRecord {
    /// Number of values attached to the file.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }
}

/// Walk a category and label the values of every member.
///
/// Members whose entity has disappeared are skipped with a warning.
///
/// # Errors
///
/// Returns the first page, read or label failure; a partial report is never
/// returned.
pub fn extract_category<C, L>(
    commons: &C,
    labels: &L,
    request: &ExtractRequest,
) -> Result<Vec<ReportRecord>, SyncError>
where
    C: CategorySource + ClaimReader + ?Sized,
    L: LabelSource + ?Sized,
{
    let members = CategoryWalker::new(commons, &request.category, request.limit)
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "{} member(s) found in {}",
        members.len(),
        request.category.page_title()
    );
    let subjects: Vec<MediaId> = members.iter().map(|m| m.subject.clone()).collect();
    let mut claims: HashMap<MediaId, ClaimSet> = HashMap::new();
    for (subject, result) in commons.read_claims_many(&subjects, &request.property) {
        match result {
            Ok(set) => {
                claims.insert(subject, set);
            }
            Err(SyncError::NotFound { entity }) => {
                warn!("skipping {entity}: entity no longer exists");
            }
            Err(err) => return Err(err),
        }
    }
    let all_values: Vec<_> = claims
        .values()
        .flat_map(|set| set.values().iter().cloned())
        .collect();
    let resolved = resolve_labels(labels, &all_values, &request.chain)?;
    Ok(members
        .into_iter()
        .filter_map(|member| {
            let set = claims.get(&member.subject)?;
            let values = set
                .values()
                .iter()
                .filter_map(|value| resolved.get(value).cloned())
                .collect();
            Some(ReportRecord {
                subject: member.subject,
                title: member.title,
                values,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryCommons, InMemoryLabels};
    use crate::{ItemId, LanguageCode};
    use rstest::{fixture, rstest};

    fn id(raw: &str) -> MediaId {
        MediaId::parse(raw).expect("media id")
    }

    fn item(raw: &str) -> ItemId {
        ItemId::parse(raw).expect("item")
    }

    #[fixture]
    fn property() -> PropertyId {
        PropertyId::new("P180").expect("property")
    }

    #[fixture]
    fn request(property: PropertyId) -> ExtractRequest {
        ExtractRequest {
            category: CategoryName::parse("Windmills").expect("category"),
            property,
            chain: LanguageChain::with_fallbacks(LanguageCode::new("nl").expect("nl")),
            limit: None,
        }
    }

    #[fixture]
    fn commons(property: PropertyId) -> InMemoryCommons {
        InMemoryCommons::new()
            .with_category_pages(
                "Windmills",
                vec![vec![("Mill A.jpg", 1), ("Mill B.jpg", 2)], vec![("Mill C.jpg", 3)]],
            )
            .with_claim(&id("M1"), &property, &item("Q38720"))
            .with_claim(&id("M1"), &property, &item("Q55"))
            .with_claim(&id("M3"), &property, &item("Q38720"))
    }

    #[fixture]
    fn labels() -> InMemoryLabels {
        InMemoryLabels::new()
            .with_label("Q38720", "nl", "windmolen")
            .with_label("Q55", "en", "Netherlands")
    }

    #[rstest]
    fn members_are_reported_in_walk_order(
        commons: InMemoryCommons,
        labels: InMemoryLabels,
        request: ExtractRequest,
    ) {
        let with_blank = commons.with_subject(id("M2"));
        let records = extract_category(&with_blank, &labels, &request).expect("extract");
        let counts: Vec<(String, usize)> = records
            .iter()
            .map(|r| (r.subject.to_string(), r.value_count()))
            .collect();
        assert_eq!(
            counts,
            [
                ("M1".to_owned(), 2),
                ("M2".to_owned(), 0),
                ("M3".to_owned(), 1)
            ]
        );
        let first = records.first().expect("first record");
        let rendered: Vec<String> = first.values.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            [
                "windmolen (https://www.wikidata.org/wiki/Q38720)",
                "Netherlands (https://www.wikidata.org/wiki/Q55)"
            ]
        );
        assert_eq!(labels.calls(), 1);
    }

    #[rstest]
    fn missing_members_are_skipped(
        commons: InMemoryCommons,
        labels: InMemoryLabels,
        request: ExtractRequest,
    ) {
        let records = extract_category(&commons, &labels, &request).expect("extract");
        let subjects: Vec<&str> = records.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, ["M1", "M3"]);
    }

    #[rstest]
    fn limit_is_applied(commons: InMemoryCommons, labels: InMemoryLabels, request: ExtractRequest) {
        let limited = ExtractRequest {
            limit: Some(1),
            ..request
        };
        let records = extract_category(&commons, &labels, &limited).expect("extract");
        assert_eq!(records.len(), 1);
        assert_eq!(commons.page_calls(), 1);
    }

    #[rstest]
    fn missing_category_aborts(labels: InMemoryLabels, request: ExtractRequest) {
        let commons = InMemoryCommons::new();
        let err = extract_category(&commons, &labels, &request).expect_err("no category");
        assert!(matches!(err, SyncError::NotFound { .. }));
    }
}
