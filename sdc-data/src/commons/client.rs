//! Commons implementations of the core remote-access traits.

use std::collections::BTreeSet;

use log::debug;
use sdc_core::{
    CategoryMember, CategoryName, CategoryPage, CategorySource, ClaimMutator, ClaimReader,
    ClaimSet, ClaimTarget, ContinuationToken, FileTitle, MediaId, PropertyId, SyncError,
    TitleLookup, WriteReceipt,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::wire::{CreateClaimResponse, EntitiesResponse, QueryResponse};
use crate::session::Session;
use crate::transport::{ApiBackend, ApiRequest, Endpoint, ResilientTransport};

/// Members requested per category page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Most ids accepted by one `wbgetentities` call.
pub const MAX_ENTITY_BATCH: usize = 50;

/// File namespace.
const FILE_NAMESPACE: &str = "6";

type ReadResults = Vec<(MediaId, Result<ClaimSet, SyncError>)>;

/// Commons API client.
///
/// Borrows a transport so the same connection pool and cookie jar can be
/// shared with [`crate::WikidataLabels`].
#[derive(Debug)]
pub struct CommonsClient<'a, B> {
    transport: &'a ResilientTransport<B>,
    session: Session,
    page_size: u32,
}

impl<'a, B: ApiBackend> CommonsClient<'a, B> {
    /// Client using `transport` with the given session.
    #[must_use]
    pub const fn new(transport: &'a ResilientTransport<B>, session: Session) -> Self {
        Self {
            transport,
            session,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the category page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// The session used for writes.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn read_batch(
        &self,
        subjects: &[MediaId],
        property: &PropertyId,
    ) -> Result<ReadResults, SyncError> {
        let ids = join_ids(subjects.iter().map(MediaId::as_str));
        let body = self.transport.send(
            &ApiRequest::read(Endpoint::Commons, "wbgetentities").param("ids", ids.clone()),
        )?;
        let response: EntitiesResponse = decode(body, || format!("reading statements of {ids}"))?;

        let mut missing = Vec::new();
        let mut results = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let result = match response.entities.get(subject.as_str()) {
                Some(entity) if entity.is_missing() => {
                    missing.push(subject.clone());
                    continue;
                }
                Some(entity) => {
                    let claims: ClaimSet = entity.item_values(property).into_iter().collect();
                    debug!("{subject} has {} existing {property} value(s)", claims.len());
                    Ok(claims)
                }
                None => Err(SyncError::decode(
                    format!("reading statements of {subject}"),
                    "entity absent from response",
                )),
            };
            results.push((subject.clone(), result));
        }

        if !missing.is_empty() {
            let existing = self.existing_pages(&missing)?;
            for subject in missing {
                let result = if existing.contains(subject.page_id()) {
                    Ok(ClaimSet::new())
                } else {
                    Err(SyncError::NotFound {
                        entity: subject.to_string(),
                    })
                };
                results.push((subject, result));
            }
            results.sort_by_key(|(subject, _)| {
                subjects.iter().position(|candidate| candidate == subject)
            });
        }
        Ok(results)
    }

    /// Page ids among `subjects` whose file page exists.
    ///
    /// A file without structured data reports its media entity as missing,
    /// so existence is decided by the page rather than the entity.
    fn existing_pages(&self, subjects: &[MediaId]) -> Result<BTreeSet<String>, SyncError> {
        let page_ids = join_ids(subjects.iter().map(MediaId::page_id));
        let body = self.transport.send(
            &ApiRequest::read(Endpoint::Commons, "query").param("pageids", page_ids.clone()),
        )?;
        let response: QueryResponse = decode(body, || format!("checking pages {page_ids}"))?;
        Ok(response
            .pages()
            .iter()
            .filter(|page| page.exists())
            .filter_map(|page| page.page_id)
            .map(|id| id.to_string())
            .collect())
    }
}

impl<B: ApiBackend> TitleLookup for CommonsClient<'_, B> {
    fn lookup_media_id(&self, title: &FileTitle) -> Result<Option<MediaId>, SyncError> {
        let body = self.transport.send(
            &ApiRequest::read(Endpoint::Commons, "query")
                .param("prop", "info")
                .param("titles", title.page_title()),
        )?;
        let response: QueryResponse = decode(body, || format!("looking up {title}"))?;
        Ok(response
            .pages()
            .iter()
            .find(|page| page.exists())
            .and_then(|page| page.page_id)
            .map(MediaId::from_page_id))
    }
}

impl<B: ApiBackend> ClaimReader for CommonsClient<'_, B> {
    fn read_claims(&self, subject: &MediaId, property: &PropertyId) -> Result<ClaimSet, SyncError> {
        self.read_batch(std::slice::from_ref(subject), property)?
            .into_iter()
            .next()
            .map_or_else(
                || {
                    Err(SyncError::NotFound {
                        entity: subject.to_string(),
                    })
                },
                |(_, result)| result,
            )
    }

    fn read_claims_many(&self, subjects: &[MediaId], property: &PropertyId) -> ReadResults {
        let mut results = Vec::with_capacity(subjects.len());
        for chunk in subjects.chunks(MAX_ENTITY_BATCH) {
            match self.read_batch(chunk, property) {
                Ok(batch) => results.extend(batch),
                // One unknown id fails the whole call; retry the batch one by one.
                Err(SyncError::NotFound { .. }) if chunk.len() > 1 => {
                    results.extend(
                        chunk
                            .iter()
                            .map(|subject| (subject.clone(), self.read_claims(subject, property))),
                    );
                }
                Err(err) => {
                    results.extend(
                        chunk
                            .iter()
                            .map(|subject| (subject.clone(), Err(err.clone()))),
                    );
                }
            }
        }
        results
    }
}

impl<B: ApiBackend> ClaimMutator for CommonsClient<'_, B> {
    fn create_claim(&self, target: &ClaimTarget) -> Result<WriteReceipt, SyncError> {
        let token = self
            .session
            .csrf_token()
            .ok_or(SyncError::MissingEditToken)?;
        let value = json!({ "entity-type": "item", "numeric-id": target.value.numeric_id() });
        let body = self.transport.send(
            &ApiRequest::edit(Endpoint::Commons, "wbcreateclaim")
                .param("entity", target.subject.as_str())
                .param("property", target.property.as_str())
                .param("snaktype", "value")
                .param("value", value.to_string())
                .param("summary", target.edit_summary())
                .param("token", token),
        )?;
        let response: CreateClaimResponse =
            decode(body, || format!("creating a claim on {}", target.subject))?;
        let confirmation = response
            .claim
            .map(|claim| claim.id)
            .or_else(|| response.page_info.map(|info| info.last_rev_id.to_string()));
        Ok(WriteReceipt { confirmation })
    }
}

impl<B: ApiBackend> CategorySource for CommonsClient<'_, B> {
    fn fetch_page(
        &self,
        category: &CategoryName,
        token: Option<&ContinuationToken>,
    ) -> Result<CategoryPage, SyncError> {
        let mut request = ApiRequest::read(Endpoint::Commons, "query")
            .param("generator", "categorymembers")
            .param("gcmtitle", category.page_title())
            .param("gcmnamespace", FILE_NAMESPACE)
            .param("gcmtype", "file")
            .param("gcmlimit", self.page_size.to_string());
        if let Some(next) = token {
            for (key, value) in next.params() {
                request = request.param(key, value.clone());
            }
        }
        let body = self.transport.send(&request)?;
        let response: QueryResponse = decode(body, || format!("listing {category}"))?;

        let members = response
            .pages()
            .iter()
            .filter(|page| page.exists())
            .filter_map(|page| {
                let subject = MediaId::from_page_id(page.page_id?);
                let title = FileTitle::parse(page.title.as_deref()?).ok()?;
                Some(CategoryMember { subject, title })
            })
            .collect();
        let next = response.continuation.map(|params| {
            params
                .into_iter()
                .map(|(key, value)| match value {
                    Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect()
        });
        Ok(CategoryPage { members, next })
    }
}

fn join_ids<'s>(ids: impl Iterator<Item = &'s str>) -> String {
    ids.collect::<Vec<_>>().join("|")
}

fn decode<T: DeserializeOwned>(
    body: Value,
    context: impl FnOnce() -> String,
) -> Result<T, SyncError> {
    serde_json::from_value(body).map_err(|err| SyncError::decode(context(), err.to_string()))
}
