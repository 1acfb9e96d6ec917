//! Behaviour-driven step definitions driving the write command scenarios.

use super::helpers::{Workspace, log_column, minimal_write_args};
use super::*;
use crate::outcome_log::CsvOutcomeLog;
use crate::rows::load_rows;
use crate::write::{WriteArgs, WriteConfig, execute_write};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use sdc_core::test_support::{InMemoryCommons, RecordingPacer};
use sdc_core::{ItemId, MediaId, PropertyId};
use std::cell::RefCell;

/// Scenario state shared by the write steps.
#[derive(Debug)]
struct WriteWorld {
    workspace: Workspace,
    store: RefCell<InMemoryCommons>,
    sheet: RefCell<Option<Utf8PathBuf>>,
    outcome: RefCell<Option<Result<Utf8PathBuf, CliError>>>,
}

impl WriteWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            store: RefCell::new(InMemoryCommons::new().with_file("Cat.jpg", 7)),
            sheet: RefCell::new(None),
            outcome: RefCell::new(None),
        }
    }

    fn with_sheet(&self, contents: &str) {
        let path = self.workspace.write("sheet.csv", contents);
        self.sheet.replace(Some(path));
    }

    fn run(&self, args: WriteArgs) {
        let sheet = self.sheet.borrow().clone();
        let log_path = self.workspace.path("logs/run.csv");
        let store = self.store.borrow();
        let outcome = WriteConfig::try_from(WriteArgs {
            input: sheet,
            ..args
        })
        .and_then(|config| {
            let loaded = load_rows(&config.input, &config.layout)?;
            let mut log = CsvOutcomeLog::create(&log_path)?;
            execute_write(
                &*store,
                &RecordingPacer::default(),
                config.driver,
                loaded.rows,
                &mut log,
            )?;
            Ok(log_path)
        });
        self.outcome.replace(Some(outcome));
    }

    fn log_path(&self) -> Utf8PathBuf {
        self.outcome
            .borrow()
            .as_ref()
            .expect("the sheet was written")
            .as_ref()
            .expect("the run succeeded")
            .clone()
    }
}

#[fixture]
fn world() -> WriteWorld {
    WriteWorld::new()
}

#[given("a sheet asking for Cat.jpg to depict Q146 and Q5")]
fn two_values(#[from(world)] world: &WriteWorld) {
    world.with_sheet("CommonsFile,QidDepicts\nCat.jpg,Q146\nCat.jpg,Q5\n");
}

#[given("a sheet asking for Cat.jpg to depict Q1, Q2 and Q3")]
fn three_values(#[from(world)] world: &WriteWorld) {
    world.with_sheet("CommonsFile,CommonsMid,QidDepicts\nCat.jpg,M7,Q1\n,M7,Q2\n,M7,Q3\n");
}

#[given("a sheet without the QidDepicts column")]
fn unmapped_sheet(#[from(world)] world: &WriteWorld) {
    world.with_sheet("CommonsFile,Depicts\nCat.jpg,Q146\n");
}

#[given("Cat.jpg already depicts Q146")]
fn existing_claim(#[from(world)] world: &WriteWorld) {
    let subject = MediaId::from_page_id(7);
    let depicts = PropertyId::new("P180").expect("property");
    let cat = ItemId::parse("Q146").expect("item");
    let store = world.store.take();
    world
        .store
        .replace(store.with_claim(&subject, &depicts, &cat));
}

#[when("the sheet is written without --commit")]
fn simulate(#[from(world)] world: &WriteWorld) {
    world.run(minimal_write_args());
}

#[when("the sheet is written with --commit and --max-ops 2")]
fn commit_with_cap(#[from(world)] world: &WriteWorld) {
    world.run(WriteArgs {
        commit: true,
        max_ops: Some(2),
        pause_ms: Some(0),
        ..minimal_write_args()
    });
}

#[then("the log actions are \"SKIPPED_DUPLICATE,WOULD_ADD\"")]
fn duplicate_then_would_add(#[from(world)] world: &WriteWorld) {
    assert_eq!(
        log_column(&world.log_path(), 5),
        ["SKIPPED_DUPLICATE", "WOULD_ADD"]
    );
}

#[then("the log actions are \"ADDED,ADDED,SKIPPED_CAP\"")]
fn capped(#[from(world)] world: &WriteWorld) {
    assert_eq!(
        log_column(&world.log_path(), 5),
        ["ADDED", "ADDED", "SKIPPED_CAP"]
    );
}

#[then("no claim was written")]
fn nothing_written(#[from(world)] world: &WriteWorld) {
    assert_eq!(world.store.borrow().write_calls(), 0);
}

#[then("2 claims were written")]
fn two_written(#[from(world)] world: &WriteWorld) {
    assert_eq!(world.store.borrow().write_calls(), 2);
}

#[then("the run fails naming the QidDepicts column")]
fn missing_column(#[from(world)] world: &WriteWorld) {
    let borrowed = world.outcome.borrow();
    let error = borrowed
        .as_ref()
        .expect("the sheet was written")
        .as_ref()
        .expect_err("expected a configuration error");
    match error {
        CliError::MissingColumns { columns, .. } => assert_eq!(columns, &["QidDepicts"]),
        other => panic!("unexpected error {other:?}"),
    }
}

macro_rules! register_write_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/write_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: WriteWorld) {
            let _ = world;
        }
    };
}

register_write_scenario!(simulated_run, "a simulated run logs what it would add");
register_write_scenario!(operation_cap, "the operation cap stops further edits");
register_write_scenario!(
    missing_mapped_column,
    "a sheet without the mapped column is rejected before any call"
);
