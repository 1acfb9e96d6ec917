//! In-memory doubles for the remote traits.
//!
//! [`InMemoryCommons`] stands in for the Commons API (title lookup, claim
//! reads and writes, category listings) and counts every call so tests can
//! assert on remote traffic. [`InMemoryLabels`] does the same for label
//! lookups. [`RecordingPacer`] and [`VecSink`] capture pacing and outcomes.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::{
    CategoryMember, CategoryName, CategoryPage, CategorySource, ClaimMutator, ClaimReader,
    ClaimSet, ClaimTarget, ContinuationToken, FileTitle, ItemId, LabelSource, LabelTable,
    LanguageChain, LanguageCode, MediaId, Outcome, OutcomeSink, Pacer, PropertyId, SinkError,
    SyncError, TitleLookup, WriteReceipt, DEFAULT_LABEL_BATCH,
};

const PAGE_KEY: &str = "gcmcontinue";

type Statements = BTreeMap<PropertyId, Vec<ItemId>>;

/// In-memory Commons: files, media entities and category listings.
#[derive(Debug, Default)]
pub struct InMemoryCommons {
    files: HashMap<FileTitle, MediaId>,
    entities: RefCell<BTreeMap<MediaId, Statements>>,
    categories: HashMap<String, Vec<Vec<CategoryMember>>>,
    lookup_error: Option<SyncError>,
    write_error: Option<SyncError>,
    lookups: Cell<usize>,
    reads: Cell<usize>,
    writes: Cell<usize>,
    pages: Cell<usize>,
}

impl InMemoryCommons {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file page and its (empty) media entity.
    #[must_use]
    pub fn with_file(mut self, name: &str, page_id: u64) -> Self {
        let subject = MediaId::from_page_id(page_id);
        if let Ok(title) = FileTitle::parse(name) {
            self.files.insert(title, subject.clone());
        }
        self.entities.get_mut().entry(subject).or_default();
        self
    }

    /// Register a media entity without statements.
    #[must_use]
    pub fn with_subject(mut self, subject: MediaId) -> Self {
        self.entities.get_mut().entry(subject).or_default();
        self
    }

    /// Attach an existing claim, creating the entity if needed.
    #[must_use]
    pub fn with_claim(mut self, subject: &MediaId, property: &PropertyId, value: &ItemId) -> Self {
        self.entities
            .get_mut()
            .entry(subject.clone())
            .or_default()
            .entry(property.clone())
            .or_default()
            .push(value.clone());
        self
    }

    /// Register a category listing split into pages of `(file, page id)`.
    ///
    /// Members are listed only; their entities are not created.
    #[must_use]
    pub fn with_category_pages(mut self, category: &str, pages: Vec<Vec<(&str, u64)>>) -> Self {
        let Ok(name) = CategoryName::parse(category) else {
            return self;
        };
        let listed = pages
            .into_iter()
            .map(|page| {
                page.into_iter()
                    .filter_map(|(file, page_id)| {
                        FileTitle::parse(file).ok().map(|title| CategoryMember {
                            subject: MediaId::from_page_id(page_id),
                            title,
                        })
                    })
                    .collect()
            })
            .collect();
        self.categories.insert(name.name().to_owned(), listed);
        self
    }

    /// Make every title lookup fail with `err`.
    #[must_use]
    pub fn failing_lookups(mut self, err: SyncError) -> Self {
        self.lookup_error = Some(err);
        self
    }

    /// Make every claim write fail with `err`.
    #[must_use]
    pub fn failing_writes(mut self, err: SyncError) -> Self {
        self.write_error = Some(err);
        self
    }

    /// Title lookups performed.
    #[must_use]
    pub fn lookup_calls(&self) -> usize {
        self.lookups.get()
    }

    /// Claim reads performed.
    #[must_use]
    pub fn read_calls(&self) -> usize {
        self.reads.get()
    }

    /// Mutating calls performed, successful or not.
    #[must_use]
    pub fn write_calls(&self) -> usize {
        self.writes.get()
    }

    /// Category pages requested.
    #[must_use]
    pub fn page_calls(&self) -> usize {
        self.pages.get()
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl TitleLookup for InMemoryCommons {
    fn lookup_media_id(&self, title: &FileTitle) -> Result<Option<MediaId>, SyncError> {
        bump(&self.lookups);
        if let Some(err) = &self.lookup_error {
            return Err(err.clone());
        }
        Ok(self.files.get(title).cloned())
    }
}

impl ClaimReader for InMemoryCommons {
    fn read_claims(
        &self,
        subject: &MediaId,
        property: &PropertyId,
    ) -> Result<ClaimSet, SyncError> {
        bump(&self.reads);
        let entities = self.entities.borrow();
        let statements = entities.get(subject).ok_or_else(|| SyncError::NotFound {
            entity: subject.to_string(),
        })?;
        Ok(statements
            .get(property)
            .map(|values| values.iter().cloned().collect())
            .unwrap_or_default())
    }
}

impl ClaimMutator for InMemoryCommons {
    fn create_claim(&self, target: &ClaimTarget) -> Result<WriteReceipt, SyncError> {
        bump(&self.writes);
        if let Some(err) = &self.write_error {
            return Err(err.clone());
        }
        let mut entities = self.entities.borrow_mut();
        let statements = entities
            .get_mut(&target.subject)
            .ok_or_else(|| SyncError::NotFound {
                entity: target.subject.to_string(),
            })?;
        statements
            .entry(target.property.clone())
            .or_default()
            .push(target.value.clone());
        Ok(WriteReceipt {
            confirmation: Some(format!("{}${:08}", target.subject, self.writes.get())),
        })
    }
}

impl CategorySource for InMemoryCommons {
    fn fetch_page(
        &self,
        category: &CategoryName,
        token: Option<&ContinuationToken>,
    ) -> Result<CategoryPage, SyncError> {
        bump(&self.pages);
        let pages = self
            .categories
            .get(category.name())
            .ok_or_else(|| SyncError::NotFound {
                entity: category.page_title(),
            })?;
        let index = match token {
            None => 0,
            Some(token) => token
                .params()
                .get(PAGE_KEY)
                .and_then(|raw| raw.strip_prefix("page|"))
                .and_then(|raw| raw.parse::<usize>().ok())
                .ok_or_else(|| SyncError::decode("listing category", "bad continuation"))?,
        };
        let members = pages.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < pages.len())
            .then(|| [(PAGE_KEY, format!("page|{}", index + 1))].into_iter().collect());
        Ok(CategoryPage { members, next })
    }
}

/// In-memory label service.
#[derive(Debug)]
pub struct InMemoryLabels {
    table: LabelTable,
    max_batch: usize,
    calls: Cell<usize>,
}

impl Default for InMemoryLabels {
    fn default() -> Self {
        Self {
            table: LabelTable::new(),
            max_batch: DEFAULT_LABEL_BATCH,
            calls: Cell::new(0),
        }
    }
}

impl InMemoryLabels {
    /// Service without labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label. Malformed identifiers are ignored.
    #[must_use]
    pub fn with_label(mut self, value: &str, language: &str, label: &str) -> Self {
        if let (Ok(item), Ok(code)) = (ItemId::parse(value), LanguageCode::new(language)) {
            self.table
                .entry(item)
                .or_default()
                .insert(code, label.to_owned());
        }
        self
    }

    /// Change the advertised batch limit.
    #[must_use]
    pub const fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Batches requested.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl LabelSource for InMemoryLabels {
    fn max_batch(&self) -> usize {
        self.max_batch
    }

    fn fetch_labels(
        &self,
        values: &[ItemId],
        chain: &LanguageChain,
    ) -> Result<LabelTable, SyncError> {
        bump(&self.calls);
        if values.len() > self.max_batch {
            return Err(SyncError::InvalidInput {
                message: format!("batch of {} exceeds {}", values.len(), self.max_batch),
            });
        }
        Ok(values
            .iter()
            .filter_map(|value| {
                let labels = self.table.get(value)?;
                let wanted: BTreeMap<LanguageCode, String> = labels
                    .iter()
                    .filter(|(code, _)| chain.codes().contains(code))
                    .map(|(code, label)| (code.clone(), label.clone()))
                    .collect();
                Some((value.clone(), wanted))
            })
            .collect())
    }
}

/// [`Pacer`] that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: RefCell<Vec<Duration>>,
}

impl RecordingPacer {
    /// Pauses requested so far.
    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.borrow().clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        self.pauses.borrow_mut().push(duration);
    }
}

/// [`OutcomeSink`] collecting outcomes in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    /// Outcomes recorded so far.
    pub outcomes: Vec<Outcome>,
    capacity: Option<usize>,
}

impl VecSink {
    /// Sink that rejects outcomes once `capacity` have been recorded.
    #[must_use]
    pub const fn failing_after(capacity: usize) -> Self {
        Self {
            outcomes: Vec::new(),
            capacity: Some(capacity),
        }
    }
}

impl OutcomeSink for VecSink {
    fn record(&mut self, outcome: &Outcome) -> Result<(), SinkError> {
        if self
            .capacity
            .is_some_and(|capacity| self.outcomes.len() >= capacity)
        {
            return Err(SinkError::new("sink full"));
        }
        self.outcomes.push(outcome.clone());
        Ok(())
    }
}
