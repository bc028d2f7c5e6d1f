//! On-disk `.snap` files.
//!
//! Layout: `identifier=body` entries sorted by identifier, separated by two
//! blank lines, with a trailing newline.
//!
//! Bodies never contain a blank line on disk: an empty body line is written
//! as a single `\\`, and a line made only of backslashes gains one more.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};

const ENTRY_SEPARATOR: &str = "\n\n\n";

const BLANK_LINE_MARKER: char = '\\';

/// In-memory view of one snapshot file.
#[derive(Debug)]
pub(super) struct SnapshotFile {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl SnapshotFile {
    /// Read `path`, treating a missing file as empty.
    pub(super) fn load(path: PathBuf) -> SnapshotResult<Self> {
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => parse(&path, &contents)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(SnapshotError::Io {
                    operation: "snapshot_file.read",
                    path,
                    source,
                });
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "loaded snapshot file");
        Ok(Self { path, entries })
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(String::as_str)
    }

    pub(super) fn insert(&mut self, identifier: String, body: String) {
        self.entries.insert(identifier, body);
    }

    pub(super) fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Write every entry back to disk, creating the directory if needed.
    pub(super) fn persist(&self) -> SnapshotResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SnapshotError::Io {
                operation: "snapshot_file.create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, render(&self.entries)).map_err(|source| SnapshotError::Io {
            operation: "snapshot_file.write",
            path: self.path.clone(),
            source,
        })
    }
}

fn parse(path: &Path, contents: &str) -> SnapshotResult<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();
    let trimmed = contents.trim_end_matches('\n');
    if trimmed.trim().is_empty() {
        return Ok(entries);
    }

    let mut line = 1;
    for chunk in trimmed.split(ENTRY_SEPARATOR) {
        let (identifier, body) = split_entry(chunk)
            .ok_or_else(|| SnapshotError::SnapshotFileCorrupt {
                path: path.to_path_buf(),
                line,
            })?;
        entries.insert(identifier.to_string(), unescape_body(body));
        line += chunk.matches('\n').count() + ENTRY_SEPARATOR.len();
    }
    Ok(entries)
}

/// Split at the first `=` outside a `[scenario]` suffix on the header line.
fn split_entry(chunk: &str) -> Option<(&str, &str)> {
    let mut depth = 0_usize;
    for (position, current) in chunk.char_indices() {
        match current {
            '\n' => return None,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '=' if depth == 0 && position > 0 => {
                return Some((&chunk[..position], &chunk[position + 1..]));
            }
            _ => {}
        }
    }
    None
}

fn render(entries: &BTreeMap<String, String>) -> String {
    let mut rendered = entries
        .iter()
        .map(|(identifier, body)| format!("{identifier}={}", escape_body(body)))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR);
    rendered.push('\n');
    rendered
}

fn escape_body(body: &str) -> String {
    body.split('\n')
        .map(|line| {
            if is_marker_run(line) {
                format!("{line}{BLANK_LINE_MARKER}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_body(body: &str) -> String {
    body.split('\n')
        .map(|line| {
            if !line.is_empty() && is_marker_run(line) {
                &line[BLANK_LINE_MARKER.len_utf8()..]
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True for the empty line and for lines made only of the marker.
fn is_marker_run(line: &str) -> bool {
    line.chars().all(|current| current == BLANK_LINE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    type TestResult = Result<(), Box<dyn Error>>;

    #[test]
    fn entries_round_trip_in_sorted_order() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("suite.snap");

        let mut file = SnapshotFile::load(path.clone())?;
        assert_eq!(file.identifiers().count(), 0);
        file.insert("suite.b".to_string(), "[\n2\n]".to_string());
        file.insert("suite.a[x=y]".to_string(), "[\n  {\n    \"k\" : 1\n  }\n]".to_string());
        file.persist()?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(
            written,
            "suite.a[x=y]=[\n  {\n    \"k\" : 1\n  }\n]\n\n\nsuite.b=[\n2\n]\n"
        );

        let reloaded = SnapshotFile::load(path)?;
        assert_eq!(reloaded.get("suite.b"), Some("[\n2\n]"));
        assert_eq!(reloaded.identifiers().collect::<Vec<_>>(), vec!["suite.a[x=y]", "suite.b"]);
        Ok(())
    }

    #[test]
    fn blank_lines_in_bodies_survive_a_reload() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("text.snap");
        let bodies = [
            ("suite.a", "[\nintro\n\n\nkey=value\n]"),
            ("suite.b", "[\nline\n\n\n]"),
            ("suite.c", "\n\\\n\\\\\n"),
            ("suite.d", ""),
        ];

        let mut file = SnapshotFile::load(path.clone())?;
        for (identifier, body) in bodies {
            file.insert(identifier.to_string(), body.to_string());
        }
        file.persist()?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(
            written,
            "suite.a=[\nintro\n\\\n\\\nkey=value\n]\n\n\n\
             suite.b=[\nline\n\\\n\\\n]\n\n\n\
             suite.c=\\\n\\\\\n\\\\\\\n\\\n\n\n\
             suite.d=\\\n"
        );

        let reloaded = SnapshotFile::load(path)?;
        for (identifier, body) in bodies {
            assert_eq!(reloaded.get(identifier), Some(body));
        }
        assert_eq!(reloaded.identifiers().count(), bodies.len());
        Ok(())
    }

    #[test]
    fn malformed_entries_report_their_line() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.snap");
        fs::write(&path, "suite.a=[\n1\n]\n\n\nno separator here\n")?;

        match SnapshotFile::load(path) {
            Err(SnapshotError::SnapshotFileCorrupt { line, .. }) => assert_eq!(line, 6),
            other => return Err(format!("expected corrupt file error, got {other:?}").into()),
        }
        Ok(())
    }
}
