//! Response shapes of the Wikibase and query APIs (`formatversion=2`).

use std::collections::BTreeMap;

use sdc_core::{ItemId, PropertyId};
use serde::Deserialize;
use serde::de::IgnoredAny;

/// `wbgetentities` response.
#[derive(Debug, Deserialize)]
pub(crate) struct EntitiesResponse {
    #[serde(default)]
    pub entities: BTreeMap<String, RawEntity>,
}

/// One entity from `wbgetentities`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    #[serde(default)]
    missing: Option<IgnoredAny>,
    #[serde(default, alias = "claims")]
    statements: Option<RawStatements>,
    #[serde(default)]
    pub labels: BTreeMap<String, RawLabel>,
}

impl RawEntity {
    pub(crate) const fn is_missing(&self) -> bool {
        self.missing.is_some()
    }

    /// Item values of `property` from value snaks, in statement order.
    pub(crate) fn item_values(&self, property: &PropertyId) -> Vec<ItemId> {
        let Some(RawStatements::Map(statements)) = &self.statements else {
            return Vec::new();
        };
        statements
            .get(property.as_str())
            .map(|claims| claims.iter().filter_map(RawClaim::item_value).collect())
            .unwrap_or_default()
    }
}

/// Commons serialises an entity without statements as `[]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStatements {
    Map(BTreeMap<String, Vec<RawClaim>>),
    Empty(
        #[expect(dead_code, reason = "only the shape matters")] Vec<IgnoredAny>,
    ),
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    #[serde(rename = "mainsnak")]
    main_snak: RawSnak,
}

impl RawClaim {
    fn item_value(&self) -> Option<ItemId> {
        if self.main_snak.snak_type != RawSnakType::Value {
            return None;
        }
        match self.main_snak.data_value.as_ref()? {
            RawDataValue::Entity { value } => value.item_id(),
            RawDataValue::Unsupported => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSnak {
    #[serde(rename = "snaktype")]
    snak_type: RawSnakType,
    #[serde(default, rename = "datavalue")]
    data_value: Option<RawDataValue>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum RawSnakType {
    Value,
    Somevalue,
    Novalue,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawDataValue {
    #[serde(rename = "wikibase-entityid")]
    Entity { value: RawEntityId },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct RawEntityId {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "numeric-id")]
    numeric_id: Option<u64>,
}

impl RawEntityId {
    fn item_id(&self) -> Option<ItemId> {
        match (&self.id, self.numeric_id) {
            (Some(id), _) => ItemId::parse(id).ok(),
            (None, Some(numeric)) => ItemId::parse(&format!("Q{numeric}")).ok(),
            (None, None) => None,
        }
    }
}

/// Label in one language.
#[derive(Debug, Deserialize)]
pub(crate) struct RawLabel {
    pub value: String,
}

/// `action=query` response carrying pages.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub query: Option<QueryPages>,
    #[serde(default, rename = "continue")]
    pub continuation: Option<BTreeMap<String, serde_json::Value>>,
}

impl QueryResponse {
    pub(crate) fn pages(&self) -> &[RawPage] {
        self.query.as_ref().map_or(&[], |query| query.pages.as_slice())
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryPages {
    #[serde(default)]
    pub pages: Vec<RawPage>,
}

/// A page from `prop=info` or a generator.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPage {
    #[serde(default, rename = "pageid")]
    pub page_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    missing: Option<IgnoredAny>,
    #[serde(default)]
    invalid: Option<IgnoredAny>,
}

impl RawPage {
    pub(crate) const fn exists(&self) -> bool {
        self.missing.is_none() && self.invalid.is_none() && self.page_id.is_some()
    }
}

/// `wbcreateclaim` response.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateClaimResponse {
    #[serde(default)]
    pub claim: Option<CreatedClaim>,
    #[serde(default, rename = "pageinfo")]
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedClaim {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageInfo {
    #[serde(rename = "lastrevid")]
    pub last_rev_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn depicts() -> PropertyId {
        PropertyId::new("P180").expect("property")
    }

    #[rstest]
    fn value_snaks_are_collected_in_order() {
        let body = json!({
            "entities": { "M7": { "id": "M7", "statements": { "P180": [
                { "mainsnak": { "snaktype": "value", "property": "P180",
                    "datavalue": { "type": "wikibase-entityid",
                        "value": { "entity-type": "item", "numeric-id": 146, "id": "Q146" } } } },
                { "mainsnak": { "snaktype": "somevalue", "property": "P180" } },
                { "mainsnak": { "snaktype": "value", "property": "P180",
                    "datavalue": { "type": "wikibase-entityid",
                        "value": { "entity-type": "item", "numeric-id": 12280 } } } },
                { "mainsnak": { "snaktype": "value", "property": "P180",
                    "datavalue": { "type": "string", "value": "not an item" } } }
            ] } } }
        });
        let response: EntitiesResponse = serde_json::from_value(body).expect("decodes");
        let entity = response.entities.get("M7").expect("entity");

        let values: Vec<String> = entity
            .item_values(&depicts())
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(values, ["Q146", "Q12280"]);
    }

    #[rstest]
    fn empty_statement_arrays_decode() {
        let body = json!({ "entities": { "M8": { "id": "M8", "statements": [] } } });
        let response: EntitiesResponse = serde_json::from_value(body).expect("decodes");
        let entity = response.entities.get("M8").expect("entity");
        assert!(!entity.is_missing());
        assert!(entity.item_values(&depicts()).is_empty());
    }

    #[rstest]
    fn missing_flags_are_detected() {
        let body = json!({ "entities": { "M9": { "id": "M9", "missing": true } } });
        let response: EntitiesResponse = serde_json::from_value(body).expect("decodes");
        assert!(response.entities.get("M9").is_some_and(RawEntity::is_missing));
    }
}
