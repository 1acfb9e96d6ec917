//! Test helpers for building sheets and argument sets.

use crate::extract::ExtractArgs;
use crate::write::WriteArgs;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Temporary working directory addressed with UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    pub(super) fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(relative);
        fs::write(path.as_std_path(), contents).expect("write workspace file");
        path
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}

pub(super) fn read_lines(path: &Utf8Path) -> Vec<String> {
    fs::read_to_string(path.as_std_path())
        .expect("read output")
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Column `index` of every data line of a CSV outcome log.
pub(super) fn log_column(path: &Utf8Path, index: usize) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path.as_std_path()).expect("open log");
    reader
        .records()
        .map(|record| {
            record
                .expect("log record")
                .get(index)
                .unwrap_or_default()
                .to_owned()
        })
        .collect()
}

/// `write` arguments that convert without errors.
pub(super) fn minimal_write_args() -> WriteArgs {
    WriteArgs {
        input: Some(Utf8PathBuf::from("sheet.csv")),
        properties: Some("P180=QidDepicts".to_owned()),
        user_agent: Some("commons-sdc-tests/0.1 (test@example.org)".to_owned()),
        ..WriteArgs::default()
    }
}

/// `extract` arguments that convert without errors.
pub(super) fn minimal_extract_args() -> ExtractArgs {
    ExtractArgs {
        category: Some("Category:Bridges in Amsterdam".to_owned()),
        user_agent: Some("commons-sdc-tests/0.1 (test@example.org)".to_owned()),
        ..ExtractArgs::default()
    }
}
