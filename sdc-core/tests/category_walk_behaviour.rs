//! Behavioural tests for category walking and batched label resolution.

use std::cell::RefCell;
use std::collections::BTreeMap;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use sdc_core::test_support::{InMemoryCommons, InMemoryLabels};
use sdc_core::{
    CategoryName, CategoryWalker, ItemId, LabelEntry, LanguageChain, LanguageCode, MediaId,
    resolve_labels,
};

#[fixture]
fn commons() -> RefCell<Option<InMemoryCommons>> {
    RefCell::new(None)
}

#[fixture]
fn walked() -> RefCell<Vec<MediaId>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn labels() -> RefCell<Option<InMemoryLabels>> {
    RefCell::new(None)
}

#[fixture]
fn resolved() -> RefCell<BTreeMap<ItemId, LabelEntry>> {
    RefCell::new(BTreeMap::new())
}

#[given("a category listed over pages of 2, 2 and 1 members")]
fn three_page_category(commons: &RefCell<Option<InMemoryCommons>>) {
    let store = InMemoryCommons::new().with_category_pages(
        "Bridges in Amsterdam",
        vec![
            vec![("Magere Brug.jpg", 1), ("Blauwbrug.jpg", 2)],
            vec![("Torensluis.jpg", 3), ("Hogesluis.jpg", 4)],
            vec![("Walter Suskindbrug.jpg", 5)],
        ],
    );
    *commons.borrow_mut() = Some(store);
}

#[when("the category is walked")]
#[expect(clippy::expect_used, reason = "steps fail fast on broken setup")]
fn walk(commons: &RefCell<Option<InMemoryCommons>>, walked: &RefCell<Vec<MediaId>>) {
    let guard = commons.borrow();
    let store = guard.as_ref().expect("commons must be initialised");
    let category = CategoryName::parse("Category:Bridges_in_Amsterdam").expect("category");
    for member in CategoryWalker::new(store, &category, None) {
        walked.borrow_mut().push(member.expect("page fetch").subject);
    }
}

#[then("5 members are returned in page order")]
fn five_in_order(walked: &RefCell<Vec<MediaId>>) {
    let ids: Vec<String> = walked.borrow().iter().map(ToString::to_string).collect();
    assert_eq!(ids, ["M1", "M2", "M3", "M4", "M5"]);
}

#[then("3 page requests were issued")]
fn three_requests(commons: &RefCell<Option<InMemoryCommons>>) {
    let calls = commons
        .borrow()
        .as_ref()
        .map_or(0, InMemoryCommons::page_calls);
    assert_eq!(calls, 3);
}

#[given("a value with only an English label")]
fn english_only(labels: &RefCell<Option<InMemoryLabels>>) {
    *labels.borrow_mut() = Some(InMemoryLabels::new().with_label("Q34442", "en", "road"));
}

#[when("labels are resolved for Dutch, English and German")]
#[expect(clippy::expect_used, reason = "steps fail fast on broken setup")]
fn resolve_dutch_first(
    labels: &RefCell<Option<InMemoryLabels>>,
    resolved: &RefCell<BTreeMap<ItemId, LabelEntry>>,
) {
    let guard = labels.borrow();
    let source = guard.as_ref().expect("labels must be initialised");
    let chain = LanguageChain::new(
        ["nl", "en", "de"]
            .into_iter()
            .map(|code| LanguageCode::new(code).expect("language")),
    );
    let value = ItemId::parse("Q34442").expect("item");
    *resolved.borrow_mut() = resolve_labels(source, &[value], &chain).expect("labels resolve");
}

#[then("the English label is returned with language en")]
fn english_label(resolved: &RefCell<BTreeMap<ItemId, LabelEntry>>) {
    let borrow = resolved.borrow();
    let entry = borrow.values().next();
    assert_eq!(entry.map(|e| e.label.as_str()), Some("road"));
    assert_eq!(
        entry.and_then(|e| e.language.as_ref()).map(LanguageCode::as_str),
        Some("en")
    );
}

#[scenario(path = "tests/features/category_walk.feature", index = 0)]
fn three_page_walk(
    commons: RefCell<Option<InMemoryCommons>>,
    walked: RefCell<Vec<MediaId>>,
    labels: RefCell<Option<InMemoryLabels>>,
    resolved: RefCell<BTreeMap<ItemId, LabelEntry>>,
) {
    let _ = (commons, walked, labels, resolved);
}

#[scenario(path = "tests/features/category_walk.feature", index = 1)]
fn label_fallback(
    commons: RefCell<Option<InMemoryCommons>>,
    walked: RefCell<Vec<MediaId>>,
    labels: RefCell<Option<InMemoryLabels>>,
    resolved: RefCell<BTreeMap<ItemId, LabelEntry>>,
) {
    let _ = (commons, walked, labels, resolved);
}
