use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};

/// The process could not be started or its stdout could not be attached.
#[derive(Debug)]
pub struct LaunchError {
    pub program: String,
    pub source: std::io::Error,
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start {}: {}", self.program, self.source)
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A launched process did not finish cleanly.
#[derive(Debug)]
pub enum WaitError {
    Exit { program: String, code: i32 },
    Io { program: String, source: std::io::Error },
}

impl WaitError {
    /// Exit code for `Exit`, `None` when waiting itself failed.
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => Some(*code),
            Self::Io { .. } => None,
        }
    }
}

impl std::fmt::Display for WaitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exit { program, code } => write!(f, "{program} exited with status {code}"),
            Self::Io { program, source } => write!(f, "wait for {program}: {source}"),
        }
    }
}

impl std::error::Error for WaitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exit { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Either half of running a process to completion.
#[derive(Debug)]
pub enum RunError {
    Launch(LaunchError),
    Wait(WaitError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(e) => e.fmt(f),
            Self::Wait(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch(e) => e.source(),
            Self::Wait(e) => e.source(),
        }
    }
}

impl From<LaunchError> for RunError {
    fn from(e: LaunchError) -> Self {
        Self::Launch(e)
    }
}

impl From<WaitError> for RunError {
    fn from(e: WaitError) -> Self {
        Self::Wait(e)
    }
}

/// Extract an exit code from a process status, mapping signals to 128+N on Unix.
pub fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

/// Turn a finished status into `Ok(())` or a [`WaitError::Exit`].
pub fn check_status(program: &str, status: std::process::ExitStatus) -> Result<(), WaitError> {
    if status.success() {
        return Ok(());
    }
    Err(WaitError::Exit {
        program: program.to_string(),
        code: exit_code_from_status(status),
    })
}

/// Escape a string for safe inclusion in a shell command (single-quote wrapping).
pub fn shell_escape(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// A running process whose stdout is exposed as a readable stream.
///
/// The caller must eventually [`wait`](Self::wait) or [`abort`](Self::abort)
/// to reap the process.
#[derive(Debug)]
pub struct Launched {
    program: String,
    child: Child,
    pub stdout: ChildStdout,
}

impl Launched {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Split into the stdout stream and a handle that can only wait or abort.
    pub fn into_parts(self) -> (ChildStdout, ProcessHandle) {
        (
            self.stdout,
            ProcessHandle {
                program: self.program,
                child: self.child,
            },
        )
    }
}

/// Owns a launched process after its stdout has been handed off.
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Child,
}

impl ProcessHandle {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Block until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::Exit`] for a non-zero exit and [`WaitError::Io`]
    /// when the wait itself fails.
    pub fn wait(mut self) -> Result<(), WaitError> {
        let status = self.child.wait().map_err(|source| WaitError::Io {
            program: self.program.clone(),
            source,
        })?;
        check_status(&self.program, status)
    }

    /// Kill and reap the process. Errors are logged, not returned: the process
    /// may already have exited on its own.
    pub fn abort(mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!("kill {}: {e}", self.program);
        }
        if let Err(e) = self.child.wait() {
            tracing::warn!("reap {}: {e}", self.program);
        }
    }
}

/// Start `program` with its stdout piped back to the caller.
///
/// Stdin is closed and stderr goes to the terminal so backend diagnostics stay
/// visible. The process runs concurrently with the caller.
///
/// # Errors
///
/// Returns [`LaunchError`] when the program cannot be found or spawned, or
/// when its stdout is not available.
pub fn launch(program: &str, args: &[String]) -> Result<Launched, LaunchError> {
    tracing::debug!(program, ?args, "launching");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| LaunchError {
            program: program.to_string(),
            source,
        })?;

    let Some(stdout) = child.stdout.take() else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(LaunchError {
            program: program.to_string(),
            source: std::io::Error::other("stdout not captured"),
        });
    };

    Ok(Launched {
        program: program.to_string(),
        child,
        stdout,
    })
}

/// Run `program` to completion and return its stdout.
///
/// Stderr is captured too so that it does not leak into the preview pane; it
/// is logged at debug level on failure.
///
/// # Errors
///
/// Returns [`RunError::Launch`] if the process cannot be spawned and
/// [`RunError::Wait`] if it exits non-zero.
pub fn capture(program: &str, args: &[String]) -> Result<String, RunError> {
    tracing::debug!(program, ?args, "capturing");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| LaunchError {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() && !output.stderr.is_empty() {
        tracing::debug!(
            "{program} stderr: {}",
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    check_status(program, output.status)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Read a stream to the end as lossy UTF-8.
pub fn read_lossy(mut reader: impl Read) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn launch_streams_stdout() {
        let launched = launch("sh", &args(&["-c", "echo one; echo two"])).unwrap();
        assert_eq!(launched.program(), "sh");
        let (stdout, handle) = launched.into_parts();
        let out = read_lossy(stdout).unwrap();
        assert_eq!(out, "one\ntwo\n");
        handle.wait().unwrap();
    }

    #[test]
    fn launch_nonexistent_program() {
        let err = launch("nonexistent_cmd_xyz", &[]).unwrap_err();
        assert_eq!(err.program, "nonexistent_cmd_xyz");
        assert!(err.to_string().starts_with("start nonexistent_cmd_xyz:"));
    }

    #[test]
    fn wait_reports_exit_code() {
        let (stdout, handle) = launch("sh", &args(&["-c", "exit 3"]))
            .unwrap()
            .into_parts();
        drop(stdout);
        let err = handle.wait().unwrap_err();
        assert_eq!(err.code(), Some(3));
        assert_eq!(err.to_string(), "sh exited with status 3");
    }

    #[test]
    fn abort_reaps_long_running_process() {
        let (_stdout, handle) = launch("sleep", &args(&["30"])).unwrap().into_parts();
        let start = std::time::Instant::now();
        handle.abort();
        assert!(start.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn capture_returns_stdout() {
        let out = capture("sh", &args(&["-c", "printf 'a\\tb\\n'"])).unwrap();
        assert_eq!(out, "a\tb\n");
    }

    #[test]
    fn capture_failure_is_wait_error() {
        let err = capture("sh", &args(&["-c", "echo oops >&2; exit 2"])).unwrap_err();
        assert!(matches!(err, RunError::Wait(WaitError::Exit { code: 2, .. })));
    }

    #[test]
    fn capture_missing_program_is_launch_error() {
        let err = capture("nonexistent_cmd_xyz", &[]).unwrap_err();
        assert!(matches!(err, RunError::Launch(_)));
    }

    #[test]
    fn shell_escape_wraps_and_escapes_quotes() {
        assert_eq!(shell_escape("plain"), "'plain'");
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_code() {
        // SIGTERM = 15, expected exit code = 128 + 15 = 143
        let err = capture("sh", &args(&["-c", "kill -TERM $$"])).unwrap_err();
        assert!(matches!(err, RunError::Wait(WaitError::Exit { code: 143, .. })));
    }
}
