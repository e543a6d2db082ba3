//! Search mode: backend → adapter → selector, then reap the backend.

use std::path::Path;

use atuin_fzf_common::{DirContext, HistoryRecord};

use crate::adapter::{self, AdapterError};
use crate::config::Config;
use crate::launcher::{self, LaunchError, WaitError};
use crate::selector::{self, SelectionOutcome, SelectorArgs, SelectorError};

/// Progress of one search run, logged as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    BackendLaunched,
    AdapterAttached,
    SelectorRunning,
    BackendAwaited,
    Done,
}

#[derive(Debug)]
pub enum PipelineError {
    Launch(LaunchError),
    /// The pipe or the adapter thread could not be created.
    Attach(std::io::Error),
    Selector(SelectorError),
    Adapter(AdapterError),
    Backend(WaitError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(e) => write!(f, "history search: {e}"),
            Self::Attach(e) => write!(f, "attach history stream: {e}"),
            Self::Selector(e) => e.fmt(f),
            Self::Adapter(e) => e.fmt(f),
            Self::Backend(e) => write!(f, "history search: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch(e) => Some(e),
            Self::Attach(e) => Some(e),
            Self::Selector(e) => Some(e),
            Self::Adapter(e) => Some(e),
            Self::Backend(e) => Some(e),
        }
    }
}

/// Arguments for the backend search feeding the selector.
pub fn backend_args(limit: u32) -> Vec<String> {
    vec![
        "search".to_string(),
        "--limit".to_string(),
        limit.to_string(),
        "--format".to_string(),
        HistoryRecord::backend_format(),
    ]
}

fn advance(stage: &mut Stage, next: Stage) {
    let from = *stage;
    tracing::debug!(?from, to = ?next, "search pipeline");
    *stage = next;
}

/// Run one interactive search.
///
/// The backend is always reaped before returning: awaited on success,
/// killed when the selector could not run.
///
/// # Errors
///
/// Returns the first failure among launching the backend, attaching the
/// adapter, running the selector, the adapter's own read/parse failure, and a
/// non-zero backend exit.
pub fn run(
    config: &Config,
    self_exe: &Path,
    query: &str,
) -> Result<SelectionOutcome, PipelineError> {
    let mut stage = Stage::Start;

    let launched = launcher::launch(&config.backend, &backend_args(config.search_limit))
        .map_err(PipelineError::Launch)?;
    let (stdout, backend) = launched.into_parts();
    advance(&mut stage, Stage::BackendLaunched);

    let (records, adapter) = match adapter::spawn(stdout, DirContext::capture()) {
        Ok(pair) => pair,
        Err(e) => {
            backend.abort();
            return Err(PipelineError::Attach(e));
        }
    };
    advance(&mut stage, Stage::AdapterAttached);

    let args = SelectorArgs {
        config,
        self_exe,
        query,
    }
    .to_args();
    advance(&mut stage, Stage::SelectorRunning);
    let outcome = match selector::run(&config.selector, &args, records) {
        Ok(outcome) => outcome,
        Err(e) => {
            // The pipe reader is gone, so the adapter stops on its next write.
            backend.abort();
            if let Err(adapter_err) = adapter.join() {
                tracing::debug!("adapter after selector failure: {adapter_err}");
            }
            return Err(PipelineError::Selector(e));
        }
    };
    tracing::debug!(?outcome, "selector finished");

    let summary = match adapter.join() {
        Ok(summary) => summary,
        Err(e) => {
            backend.abort();
            return Err(PipelineError::Adapter(e));
        }
    };

    match backend.wait() {
        Ok(()) => {}
        // The adapter closed the backend's stdout after the selector went away;
        // the backend dying on that closed pipe is expected.
        Err(WaitError::Exit { code, .. }) if summary.consumer_closed => {
            tracing::debug!(code, "backend exited after selector closed its input");
        }
        Err(e) => return Err(PipelineError::Backend(e)),
    }
    advance(&mut stage, Stage::BackendAwaited);

    advance(&mut stage, Stage::Done);
    Ok(outcome)
}
