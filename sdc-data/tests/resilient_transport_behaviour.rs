//! Behavioural tests for retried writes through the Commons adapter.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use sdc_core::test_support::{RecordingPacer, VecSink};
use sdc_core::{Driver, DriverConfig, InputRow, OutcomeKind};
use sdc_data::transport::test_support::ScriptedBackend;
use sdc_data::{CommonsClient, ResilientTransport, RetryPolicy, Session, TransportError};
use serde_json::{Value, json};

type Transport = ResilientTransport<ScriptedBackend>;

#[fixture]
fn transport() -> RefCell<Option<Transport>> {
    RefCell::new(None)
}

#[fixture]
fn outcomes() -> RefCell<Vec<OutcomeKind>> {
    RefCell::new(Vec::new())
}

fn gateway(status: u16) -> TransportError {
    TransportError::Http {
        url: "https://commons.wikimedia.org/w/api.php".to_owned(),
        status,
    }
}

fn api_error(code: &str) -> Value {
    json!({ "error": { "code": code, "info": format!("{code} reported by the API") } })
}

fn without_statements() -> ScriptedBackend {
    ScriptedBackend::new().respond(
        "wbgetentities",
        Ok(json!({ "entities": { "M7": { "id": "M7", "statements": [] } } })),
    )
}

fn install(transport: &RefCell<Option<Transport>>, backend: ScriptedBackend) {
    *transport.borrow_mut() = Some(ResilientTransport::new(
        backend,
        RetryPolicy::immediate(4),
        5,
    ));
}

#[given("a Commons API that fails the first two writes with transient errors")]
fn flaky_writes(transport: &RefCell<Option<Transport>>) {
    let backend = without_statements()
        .respond("wbcreateclaim", Err(gateway(502)))
        .respond("wbcreateclaim", Ok(api_error("maxlag")))
        .respond(
            "wbcreateclaim",
            Ok(json!({ "success": 1, "claim": { "id": "M7$0F1E" } })),
        );
    install(transport, backend);
}

#[given("a Commons API that rejects the edit token")]
fn bad_token(transport: &RefCell<Option<Transport>>) {
    install(
        transport,
        without_statements().respond("wbcreateclaim", Ok(api_error("badtoken"))),
    );
}

#[given("a Commons API that stays overloaded")]
fn overloaded(transport: &RefCell<Option<Transport>>) {
    install(
        transport,
        without_statements().respond("wbcreateclaim", Err(gateway(503))),
    );
}

#[when("one depicts row for M7 is run with writes enabled")]
#[expect(clippy::expect_used, reason = "steps fail fast on broken setup")]
fn run_one_row(transport: &RefCell<Option<Transport>>, outcomes: &RefCell<Vec<OutcomeKind>>) {
    let guard = transport.borrow();
    let api = guard.as_ref().expect("transport must be initialised");
    let client = CommonsClient::new(api, Session::with_token("token+\\"));
    let pacer = RecordingPacer::default();
    let config = DriverConfig::default()
        .with_simulate(false)
        .with_max_ops(None);
    let mut sink = VecSink::default();
    let row = InputRow {
        file_ref: "File:Cat.jpg".to_owned(),
        media_id: Some("M7".to_owned()),
        property: "P180".to_owned(),
        value: "Q146".to_owned(),
    };

    let report = Driver::new(&client, &pacer, config)
        .run([row], &mut sink)
        .expect("sink accepts outcomes");

    outcomes
        .borrow_mut()
        .extend(report.outcomes.iter().map(|outcome| outcome.kind));
}

#[then("exactly one ADDED outcome is reported")]
fn one_added(outcomes: &RefCell<Vec<OutcomeKind>>) {
    assert_eq!(outcomes.borrow().as_slice(), [OutcomeKind::Added]);
}

#[then("exactly one ERROR outcome is reported")]
fn one_error(outcomes: &RefCell<Vec<OutcomeKind>>) {
    assert_eq!(outcomes.borrow().as_slice(), [OutcomeKind::Error]);
}

fn write_attempts(transport: &RefCell<Option<Transport>>) -> usize {
    transport
        .borrow()
        .as_ref()
        .map_or(0, |t| t.backend().calls("wbcreateclaim"))
}

#[then("three write attempts reached the API")]
fn three_attempts(transport: &RefCell<Option<Transport>>) {
    assert_eq!(write_attempts(transport), 3);
}

#[then("one write attempt reached the API")]
fn one_attempt(transport: &RefCell<Option<Transport>>) {
    assert_eq!(write_attempts(transport), 1);
}

#[then("four write attempts reached the API")]
fn four_attempts(transport: &RefCell<Option<Transport>>) {
    assert_eq!(write_attempts(transport), 4);
}

#[scenario(path = "tests/features/resilient_transport.feature", index = 0)]
fn transient_failures_retried(
    transport: RefCell<Option<Transport>>,
    outcomes: RefCell<Vec<OutcomeKind>>,
) {
    let _ = (transport, outcomes);
}

#[scenario(path = "tests/features/resilient_transport.feature", index = 1)]
fn bad_token_not_retried(
    transport: RefCell<Option<Transport>>,
    outcomes: RefCell<Vec<OutcomeKind>>,
) {
    let _ = (transport, outcomes);
}

#[scenario(path = "tests/features/resilient_transport.feature", index = 2)]
fn retries_exhausted(transport: RefCell<Option<Transport>>, outcomes: RefCell<Vec<OutcomeKind>>) {
    let _ = (transport, outcomes);
}
