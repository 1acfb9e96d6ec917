//! Wikidata label lookups.

use sdc_core::{ItemId, LabelSource, LabelTable, LanguageChain, LanguageCode, SyncError};

use crate::commons::EntitiesResponse;
use crate::transport::{ApiBackend, ApiRequest, Endpoint, ResilientTransport};

/// [`LabelSource`] backed by `wbgetentities` on Wikidata.
#[derive(Debug)]
pub struct WikidataLabels<'a, B> {
    transport: &'a ResilientTransport<B>,
}

impl<'a, B: ApiBackend> WikidataLabels<'a, B> {
    /// Label source sending requests through `transport`.
    #[must_use]
    pub const fn new(transport: &'a ResilientTransport<B>) -> Self {
        Self { transport }
    }

    fn fetch_batch(
        &self,
        values: &[ItemId],
        chain: &LanguageChain,
    ) -> Result<LabelTable, SyncError> {
        let ids = values
            .iter()
            .map(ItemId::as_str)
            .collect::<Vec<_>>()
            .join("|");
        let body = self.transport.send(
            &ApiRequest::read(Endpoint::Wikidata, "wbgetentities")
                .param("ids", ids.clone())
                .param("props", "labels")
                .param("languages", chain.joined()),
        )?;
        let response: EntitiesResponse = serde_json::from_value(body)
            .map_err(|err| SyncError::decode(format!("reading labels of {ids}"), err.to_string()))?;

        let mut table = LabelTable::new();
        for (id, entity) in response.entities {
            if entity.is_missing() {
                continue;
            }
            let Ok(value) = ItemId::parse(&id) else {
                continue;
            };
            let labels = entity
                .labels
                .into_iter()
                .filter_map(|(language, label)| {
                    LanguageCode::new(&language).ok().map(|code| (code, label.value))
                })
                .collect();
            table.insert(value, labels);
        }
        Ok(table)
    }
}

impl<B: ApiBackend> LabelSource for WikidataLabels<'_, B> {
    fn fetch_labels(
        &self,
        values: &[ItemId],
        chain: &LanguageChain,
    ) -> Result<LabelTable, SyncError> {
        match self.fetch_batch(values, chain) {
            // An unknown id fails the whole call; ask one by one and drop the unknown ones.
            Err(SyncError::NotFound { .. }) if values.len() > 1 => {
                let mut table = LabelTable::new();
                for value in values {
                    match self.fetch_batch(std::slice::from_ref(value), chain) {
                        Ok(single) => table.extend(single),
                        Err(SyncError::NotFound { .. }) => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(table)
            }
            Err(SyncError::NotFound { .. }) => Ok(LabelTable::new()),
            other => other,
        }
    }
}
