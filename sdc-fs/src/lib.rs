//! Input and output files for the synchroniser, opened through `cap-std`.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Placeholder replaced by a run stamp in output paths.
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Open an existing file for reading.
pub fn open_input(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Create or truncate `path` for writing, creating missing parent directories.
pub fn create_output(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    ensure_parent_dir(path)?;
    let (dir, name) = parent_and_name(path)?;
    dir.create(name.as_str())
}

/// Substitute every `{timestamp}` in `template` with `stamp`.
///
/// # Examples
/// ```
/// use camino::Utf8Path;
///
/// let path = sdc_fs::expand_timestamp(
///     Utf8Path::new("logs/write_sdc_log_{timestamp}.csv"),
///     "20240131-101500",
/// );
/// assert_eq!(path.as_str(), "logs/write_sdc_log_20240131-101500.csv");
/// ```
#[must_use]
pub fn expand_timestamp(template: &Utf8Path, stamp: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(template.as_str().replace(TIMESTAMP_PLACEHOLDER, stamp))
}

/// Ensure the directory that will hold `path` exists.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (root, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    root.create_dir_all(&relative)
}

fn parent_and_name(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Open the filesystem root (or current directory) above `dir` and return
/// the remainder of `dir` relative to it.
fn split_root(dir: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let (base, relative) = match dir.as_std_path().components().next() {
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = dir
                .strip_prefix(&base)
                .or_else(|_| dir.strip_prefix(prefix_str))
                .map_err(|_| io::Error::other(format!("cannot strip {prefix_str} from {dir}")))?
                .to_owned();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = dir
                .strip_prefix(&base)
                .map_err(|_| io::Error::other(format!("cannot strip root from {dir}")))?
                .to_owned();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), dir.to_owned()),
    };
    let root = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    Ok((root, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{Read, Write};

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("temp paths are UTF-8")
    }

    #[rstest]
    fn outputs_create_missing_directories() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = utf8(temp.path()).join("logs/nested/run.csv");

        let mut file = create_output(&target).expect("create");
        file.write_all(b"timestamp\n").expect("write");
        drop(file);

        let mut text = String::new();
        open_input(&target)
            .expect("open")
            .read_to_string(&mut text)
            .expect("read");
        assert_eq!(text, "timestamp\n");
    }

    #[rstest]
    fn outputs_truncate_existing_files() {
        let temp = tempfile::tempdir().expect("temp dir");
        let target = utf8(temp.path()).join("report.csv");
        create_output(&target)
            .expect("first")
            .write_all(b"old contents")
            .expect("write");

        create_output(&target).expect("second").write_all(b"new").expect("write");

        let mut text = String::new();
        open_input(&target)
            .expect("open")
            .read_to_string(&mut text)
            .expect("read");
        assert_eq!(text, "new");
    }

    #[rstest]
    #[case("plain.csv", "plain.csv")]
    #[case("{timestamp}/{timestamp}.csv", "S/S.csv")]
    fn every_placeholder_is_expanded(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(expand_timestamp(Utf8Path::new(template), "S").as_str(), expected);
    }

    #[rstest]
    fn missing_inputs_report_not_found() {
        let temp = tempfile::tempdir().expect("temp dir");
        let err = open_input(&utf8(temp.path()).join("absent.csv")).expect_err("absent");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
