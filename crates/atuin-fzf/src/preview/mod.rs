//! Preview pane: details of one selected record plus recent similar commands.
//!
//! Runs in a separate process started by the selector for every highlighted
//! row, so it must be quick and must never leave a half-written report behind
//! when its input is unusable.

use std::collections::HashSet;
use std::fmt::Write as _;

use atuin_fzf_common::style::{Color, bold};
use atuin_fzf_common::{HistoryRecord, MalformedRecord};

use crate::launcher;


const RULE: &str = "───────────────────────────────────────────────────";

/// Width of the command column in the related-commands block.
const COMMAND_WIDTH: usize = 40;

/// Output template for related-command queries: command, tab, directory.
#[allow(clippy::literal_string_with_formatting_args)]
const RELATED_FORMAT: &str = "{command}\t{directory}";

/// Where a related-command query looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Global,
    Directory(&'a str),
}

impl Scope<'_> {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Directory(_) => "directory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedQuery<'a> {
    /// Prefix the related commands must start with.
    pub command: &'a str,
    pub scope: Scope<'a>,
    pub limit: u32,
}

/// Source of related commands, one `command\tdirectory` pair per line.
pub trait RelatedSource: Sync {
    /// Run one query and return its raw output.
    ///
    /// # Errors
    ///
    /// Returns an error if the query could not be run or failed.
    fn related(&self, query: &RelatedQuery<'_>) -> anyhow::Result<String>;
}

/// Queries the history backend with a prefix search.
#[derive(Debug, Clone)]
pub struct BackendSource {
    pub program: String,
}

impl BackendSource {
    pub fn args(query: &RelatedQuery<'_>) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "search".into(),
            "--limit".into(),
            query.limit.to_string(),
            "--search-mode".into(),
            "prefix".into(),
        ];
        if let Scope::Directory(dir) = query.scope {
            args.extend(["--cwd".into(), dir.to_string()]);
        }
        args.extend([
            "--format".into(),
            RELATED_FORMAT.to_string(),
            // Commands starting with '-' must not be read as backend flags.
            "--".into(),
            query.command.to_string(),
        ]);
        args
    }
}

impl RelatedSource for BackendSource {
    fn related(&self, query: &RelatedQuery<'_>) -> anyhow::Result<String> {
        Ok(launcher::capture(&self.program, &Self::args(query))?)
    }
}

/// A related-command query that failed. Reported after the report itself.
#[derive(Debug)]
pub struct QueryFailure {
    pub scope: &'static str,
    pub error: anyhow::Error,
}

impl std::fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} related commands: {:#}", self.scope, self.error)
    }
}

/// Related commands merged across sources in first-seen order.
///
/// Keyed on the exact `command\tdirectory` line; a line without a tab still
/// counts as seen but is not shown.
#[derive(Debug, Default)]
pub struct RelatedCommands {
    seen: HashSet<String>,
    entries: Vec<(String, String)>,
}

impl RelatedCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every new line of one source's output.
    pub fn extend_from_output(&mut self, output: &str) {
        for line in output.lines() {
            if !self.seen.insert(line.to_string()) {
                continue;
            }
            if let Some((command, directory)) = line.split_once('\t') {
                self.entries
                    .push((command.to_string(), directory.to_string()));
            }
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn write_to(&self, out: &mut String) {
        for (command, directory) in &self.entries {
            let _ = writeln!(
                out,
                "{command:<width$.width$} ({directory})",
                width = COMMAND_WIDTH
            );
        }
    }
}

/// A rendered preview. `failures` is non-empty when a related-command query
/// failed; `report` still contains everything that succeeded.
#[derive(Debug)]
pub struct Preview {
    pub report: String,
    pub failures: Vec<QueryFailure>,
}

impl Preview {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", bold(title));
    let _ = writeln!(out, "{RULE}");
}

fn detail(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{label:<10} {value}");
}

/// Run both related-command queries concurrently and merge them, global
/// results first.
pub fn collect_related(
    record: &HistoryRecord,
    source: &dyn RelatedSource,
    limit: u32,
) -> (RelatedCommands, Vec<QueryFailure>) {
    let global = RelatedQuery {
        command: &record.command,
        scope: Scope::Global,
        limit,
    };
    let local = RelatedQuery {
        command: &record.command,
        scope: Scope::Directory(&record.directory),
        limit,
    };

    let results = std::thread::scope(|s| {
        let dir_task = s.spawn(|| source.related(&local));
        let global_result = source.related(&global);
        let dir_result = dir_task
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("directory query panicked")));
        [(global.scope, global_result), (local.scope, dir_result)]
    });

    let mut related = RelatedCommands::new();
    let mut failures = Vec::new();
    for (scope, result) in results {
        match result {
            Ok(output) => related.extend_from_output(&output),
            Err(error) => {
                tracing::debug!(scope = scope.label(), "related query failed: {error:#}");
                failures.push(QueryFailure {
                    scope: scope.label(),
                    error,
                });
            }
        }
    }
    (related, failures)
}

/// Render the preview for one selector row (`:::`-joined fields).
///
/// # Errors
///
/// Returns [`MalformedRecord`] when `raw` has fewer than five fields. Nothing
/// is rendered in that case and no query is run.
pub fn render(
    raw: &str,
    source: &dyn RelatedSource,
    limit: u32,
) -> Result<Preview, MalformedRecord> {
    let record = HistoryRecord::parse(raw)?;
    let status_color = if record.succeeded() {
        Color::Green
    } else {
        Color::Red
    };

    let mut report = String::new();
    section(&mut report, "Full Command");
    let _ = writeln!(report, "{}", record.command);
    report.push('\n');

    section(&mut report, "Execution Details");
    detail(&mut report, "Status:", &status_color.fg(&record.exit_code));
    detail(&mut report, "Ran In:", &record.directory);
    detail(&mut report, "Duration:", &record.duration);
    detail(&mut report, "When:", &record.timestamp);
    report.push('\n');

    section(&mut report, "Recent Similar Commands");
    let (related, failures) = collect_related(&record, source, limit);
    related.write_to(&mut report);

    Ok(Preview { report, failures })
}
