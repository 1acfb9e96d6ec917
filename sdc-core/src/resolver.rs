//! Resolution of file references to media identifiers.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::{FileTitle, IdError, MediaId, SyncError};

/// Remote lookup from a file title to its media identifier.
pub trait TitleLookup {
    /// Look up the media id of `title`, returning `None` for missing pages.
    ///
    /// # Errors
    ///
    /// Returns the transport failure when the lookup cannot be completed.
    fn lookup_media_id(&self, title: &FileTitle) -> Result<Option<MediaId>, SyncError>;
}

/// Why a row could not be given a subject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRef {
    /// Neither a media id nor a file reference was usable.
    #[error("no usable media id or file reference: {0}")]
    Unparseable(#[source] IdError),
    /// The file page does not exist.
    #[error("{title} does not exist on Commons")]
    NoSuchFile {
        /// Title that was looked up.
        title: FileTitle,
    },
    /// The lookup failed.
    #[error("lookup of {title} failed: {source}")]
    Lookup {
        /// Title that was looked up.
        title: FileTitle,
        /// Underlying failure.
        #[source]
        source: SyncError,
    },
}

/// A subject together with the title it was resolved from, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical media id.
    pub subject: MediaId,
    /// Normalised file title.
    pub title: Option<FileTitle>,
}

/// Turns file references into media ids, caching lookups per title.
#[derive(Debug)]
pub struct IdentifierResolver<'a, L: ?Sized> {
    lookup: &'a L,
    cache: HashMap<FileTitle, MediaId>,
}

impl<'a, L> IdentifierResolver<'a, L>
where
    L: TitleLookup + ?Sized,
{
    /// Create a resolver with an empty cache.
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }

    /// Resolve a row's subject.
    ///
    /// A well-formed `supplied` media id is used as-is without a remote call.
    /// Otherwise `file_ref` is normalised and looked up once per title.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRef`] when nothing usable was supplied, the file does
    /// not exist or the lookup failed. Callers classify these rows as
    /// invalid and continue.
    pub fn resolve(
        &mut self,
        file_ref: &str,
        supplied: Option<&str>,
    ) -> Result<Resolved, InvalidRef> {
        let parsed = FileTitle::parse(file_ref);
        if let Some(subject) = supplied
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| MediaId::parse(raw).ok())
        {
            return Ok(Resolved {
                subject,
                title: parsed.ok(),
            });
        }
        let title = parsed.map_err(InvalidRef::Unparseable)?;
        if let Some(hit) = self.cache.get(&title) {
            return Ok(Resolved {
                subject: hit.clone(),
                title: Some(title),
            });
        }
        let found = self
            .lookup
            .lookup_media_id(&title)
            .map_err(|source| InvalidRef::Lookup {
                title: title.clone(),
                source,
            })?;
        let Some(subject) = found else {
            return Err(InvalidRef::NoSuchFile { title });
        };
        debug!("resolved {} to {subject}", title.page_title());
        self.cache.insert(title.clone(), subject.clone());
        Ok(Resolved {
            subject,
            title: Some(title),
        })
    }

    /// Number of titles held in the cache.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
