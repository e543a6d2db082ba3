pub mod adapter;
pub mod config;
pub mod launcher;
pub mod pipeline;
pub mod preview;
pub mod selector;

use std::io::Write;

use anyhow::Context;

use crate::config::Config;
use crate::preview::BackendSource;

/// The two ways this program is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive search with an initial query (may be empty).
    Search { query: String },
    /// Render the preview pane for one selector row. `None` when `--preview`
    /// was given without a value; nothing is printed then.
    Preview { record: Option<String> },
}

/// Run one mode to completion and return the process exit code.
///
/// # Errors
///
/// Returns any fatal error; the caller prints it and exits non-zero.
pub fn run(mode: &Mode, config: &Config) -> anyhow::Result<i32> {
    match mode {
        Mode::Search { query } => run_search(config, query),
        Mode::Preview { record: None } => Ok(0),
        Mode::Preview {
            record: Some(record),
        } => run_preview(config, record),
    }
}

fn run_search(config: &Config, query: &str) -> anyhow::Result<i32> {
    let self_exe = std::env::current_exe().context("self executable")?;
    let outcome = pipeline::run(config, &self_exe, query)?;
    Ok(outcome.exit_code())
}

fn run_preview(config: &Config, record: &str) -> anyhow::Result<i32> {
    let source = BackendSource {
        program: config.backend.clone(),
    };
    let preview = preview::render(record, &source, config.related_limit)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(preview.report.as_bytes())?;
    stdout.flush()?;

    if preview.is_complete() {
        return Ok(0);
    }
    for failure in &preview.failures {
        eprintln!("[atuin-fzf] error: {failure}");
    }
    Ok(1)
}
