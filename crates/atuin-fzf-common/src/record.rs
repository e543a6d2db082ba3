//! Line codec for history records exchanged with the backend.
//!
//! A record is one line of exactly [`FIELD_COUNT`] fields joined by
//! [`DELIMITER`]: command, exit code, directory, duration, timestamp. Fields are
//! not escaped, so a command that itself contains the delimiter shifts the
//! remaining fields. The backend's output template is built from the same
//! constants, see [`HistoryRecord::backend_format`].

/// Field separator shared by the backend output template and the selector.
pub const DELIMITER: &str = ":::";

/// Number of fields in a raw history record.
pub const FIELD_COUNT: usize = 5;

/// Backend template placeholders, in wire order.
#[allow(clippy::literal_string_with_formatting_args)]
const BACKEND_FIELDS: [&str; FIELD_COUNT] =
    ["{command}", "{exit}", "{directory}", "{duration}", "{time}"];

/// A line that splits into fewer than [`FIELD_COUNT`] fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub found: usize,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "data format incorrect, expected {FIELD_COUNT} parts, got {}",
            self.found
        )
    }
}

impl std::error::Error for MalformedRecord {}

/// One history entry as emitted by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub command: String,
    /// Kept as text: the backend may print codes that do not fit an `i32`.
    pub exit_code: String,
    pub directory: String,
    pub duration: String,
    pub timestamp: String,
}

impl HistoryRecord {
    /// Parse one delimited line.
    ///
    /// Fields after the fifth are ignored, which lets the preview pane pass the
    /// selector's extra columns straight through.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRecord`] when the line has fewer than five fields.
    pub fn parse(line: &str) -> Result<Self, MalformedRecord> {
        let mut parts = line.split(DELIMITER);
        let (
            Some(command),
            Some(exit_code),
            Some(directory),
            Some(duration),
            Some(timestamp),
        ) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        )
        else {
            return Err(MalformedRecord {
                found: line.split(DELIMITER).count(),
            });
        };

        Ok(Self {
            command: command.to_string(),
            exit_code: exit_code.to_string(),
            directory: directory.to_string(),
            duration: duration.to_string(),
            timestamp: timestamp.to_string(),
        })
    }

    /// Whether the recorded command exited successfully.
    pub fn succeeded(&self) -> bool {
        self.exit_code == "0"
    }

    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.command,
            &self.exit_code,
            &self.directory,
            &self.duration,
            &self.timestamp,
        ]
    }

    /// Join the fields back into one line (no trailing newline).
    pub fn serialize(&self) -> String {
        self.fields().join(DELIMITER)
    }

    /// The `--format` template that makes the backend emit parseable lines.
    pub fn backend_format() -> String {
        BACKEND_FIELDS.join(DELIMITER)
    }
}
