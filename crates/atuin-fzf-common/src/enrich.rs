//! Display-only columns appended to each record before it reaches the selector.

use std::path::{Path, PathBuf};

use crate::record::{DELIMITER, HistoryRecord};
use crate::style::{Color, dim};

/// Marker shown for successful commands. A single space keeps the column
/// non-empty so fzf's `--with-nth` spacing stays stable.
const SUCCESS_MARKER: &str = " ";

/// The working directory captured once when the adapter starts.
///
/// `None` means it could not be determined; no record matches in that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirContext(Option<PathBuf>);

impl DirContext {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(Some(dir.into()))
    }

    /// A context that never matches.
    pub const fn unknown() -> Self {
        Self(None)
    }

    /// Capture the process working directory, best effort.
    pub fn capture() -> Self {
        Self(std::env::current_dir().ok())
    }

    pub fn path(&self) -> Option<&Path> {
        self.0.as_deref()
    }

    /// Exact textual comparison, the same way the backend stores directories.
    pub fn matches(&self, directory: &str) -> bool {
        self.0
            .as_deref()
            .is_some_and(|cwd| cwd.as_os_str() == directory)
    }
}

/// A [`HistoryRecord`] plus its two derived selector columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub record: HistoryRecord,
    pub exit_marker: String,
    pub dir_context: String,
}

impl EnrichedRecord {
    pub fn new(record: HistoryRecord, cwd: &DirContext) -> Self {
        let exit_marker = if record.succeeded() {
            SUCCESS_MARKER.to_string()
        } else {
            Color::Red.fg(&format!("exit {}", record.exit_code))
        };

        let dir_context = if cwd.matches(&record.directory) {
            format!(" {}", dim("(current dir)"))
        } else {
            String::new()
        };

        Self {
            record,
            exit_marker,
            dir_context,
        }
    }

    /// Seven fields joined by [`DELIMITER`]: the five record fields, then the
    /// exit marker and the directory annotation.
    pub fn serialize(&self) -> String {
        let mut line = self.record.serialize();
        line.push_str(DELIMITER);
        line.push_str(&self.exit_marker);
        line.push_str(DELIMITER);
        line.push_str(&self.dir_context);
        line
    }
}
