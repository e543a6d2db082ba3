//! Stream adapter: turns the backend's raw record stream into the enriched
//! stream the selector reads, while the backend is still producing.
//!
//! One worker thread owns both the input and the write end of an OS pipe.
//! The read end is returned to the caller right away so the selector can start
//! rendering before the backend has finished. The pipe gives natural
//! backpressure: the worker blocks on write until the selector reads.
//!
//! The worker stops on the first of:
//! - end of input (normal),
//! - a failed write, usually because the selector exited (benign),
//! - a read error or a malformed line (reported through [`AdapterHandle::join`]).
//!
//! The pipe writer and the input are dropped on every one of those paths. The
//! reader then sees end-of-stream, and the backend sees its own stdout closed.

use std::io::{BufRead, BufReader, PipeReader, PipeWriter, Read, Write};
use std::thread::JoinHandle;

use atuin_fzf_common::{DirContext, EnrichedRecord, HistoryRecord, MalformedRecord};


/// What the worker did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterSummary {
    /// Enriched lines written to the pipe.
    pub records: usize,
    /// The consumer closed its end before the input was exhausted.
    pub consumer_closed: bool,
}

#[derive(Debug)]
pub enum AdapterError {
    /// Reading the backend stream failed.
    Read(std::io::Error),
    /// A backend line did not have enough fields. `line` is 1-based.
    Malformed { line: usize, source: MalformedRecord },
    /// The worker thread panicked.
    Panicked,
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read history stream: {e}"),
            Self::Malformed { line, source } => write!(f, "history line {line}: {source}"),
            Self::Panicked => write!(f, "history stream worker panicked"),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(e) => Some(e),
            Self::Malformed { source, .. } => Some(source),
            Self::Panicked => None,
        }
    }
}

/// Join handle for the worker started by [`spawn`].
#[derive(Debug)]
pub struct AdapterHandle {
    worker: JoinHandle<Result<AdapterSummary, AdapterError>>,
}

impl AdapterHandle {
    /// Wait for the worker to stop.
    ///
    /// Returns promptly once the input ends or the pipe reader is dropped.
    ///
    /// # Errors
    ///
    /// Returns the read or parse failure that stopped the worker.
    pub fn join(self) -> Result<AdapterSummary, AdapterError> {
        self.worker.join().map_err(|_| AdapterError::Panicked)?
    }
}

/// Start enriching `input` on a worker thread.
///
/// `cwd` is captured once by the caller and decides the `(current dir)`
/// annotation for every record.
///
/// # Errors
///
/// Returns an error if the pipe or the worker thread cannot be created.
pub fn spawn<R>(input: R, cwd: DirContext) -> std::io::Result<(PipeReader, AdapterHandle)>
where
    R: Read + Send + 'static,
{
    let (reader, writer) = std::io::pipe()?;
    let worker = std::thread::Builder::new()
        .name("history-adapter".to_string())
        .spawn(move || pump(input, writer, &cwd))?;
    Ok((reader, AdapterHandle { worker }))
}

/// Worker body. Owns `input` and `writer`, so both are closed when it returns.
fn pump<R: Read>(
    input: R,
    mut writer: PipeWriter,
    cwd: &DirContext,
) -> Result<AdapterSummary, AdapterError> {
    let mut summary = AdapterSummary::default();
    let mut reader = BufReader::new(input);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).map_err(AdapterError::Read)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(trim_newline(&buf));
        let record = HistoryRecord::parse(&line).map_err(|source| AdapterError::Malformed {
            line: summary.records + 1,
            source,
        })?;

        let mut out = EnrichedRecord::new(record, cwd).serialize();
        out.push('\n');
        if let Err(e) = writer.write_all(out.as_bytes()) {
            tracing::debug!(
                records = summary.records,
                "selector stopped reading: {e}"
            );
            summary.consumer_closed = true;
            break;
        }
        summary.records += 1;
    }

    tracing::debug!(?summary, "history stream finished");
    Ok(summary)
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
