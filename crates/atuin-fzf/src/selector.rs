//! Runs the interactive selector (fzf) over the enriched record stream.
//!
//! The selector sees seven `:::`-separated columns per line but only displays
//! the command and the two annotations. All columns are forwarded to the
//! preview command, which re-invokes this program with `--preview`.

use std::path::Path;
use std::process::{Command, Stdio};

use atuin_fzf_common::DELIMITER;

use crate::config::Config;
use crate::launcher::{LaunchError, WaitError, check_status, shell_escape};

/// fzf exit status when nothing matched the query.
pub const EXIT_NO_MATCH: i32 = 1;
/// fzf exit status after ctrl-c / esc, or an `abort` action.
pub const EXIT_INTERRUPTED: i32 = 130;

pub const PROMPT: &str = "> ";
pub const HEADER: &str = "[Enter] to select, [Ctrl-Y] to yank.";
const HEADER_NO_YANK: &str = "[Enter] to select.";

/// Columns handed to the preview: five record fields plus the exit marker.
const PREVIEW_COLUMNS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// A record was accepted and its command printed to stdout.
    Selected,
    NoMatch,
    /// The operator dismissed the selector (including the yank binding).
    Aborted,
}

impl SelectionOutcome {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Selected => 0,
            Self::NoMatch => EXIT_NO_MATCH,
            Self::Aborted => EXIT_INTERRUPTED,
        }
    }
}

#[derive(Debug)]
pub enum SelectorError {
    Launch(LaunchError),
    /// Any exit other than success, no-match or abort.
    Failed(WaitError),
}

impl std::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Launch(e) => write!(f, "run selector: {e}"),
            Self::Failed(e) => write!(f, "run selector: {e}"),
        }
    }
}

impl std::error::Error for SelectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch(e) => Some(e),
            Self::Failed(e) => Some(e),
        }
    }
}

/// Command line for one selector run.
#[derive(Debug, Clone)]
pub struct SelectorArgs<'a> {
    pub config: &'a Config,
    /// Path of this executable, used for the preview command.
    pub self_exe: &'a Path,
    pub query: &'a str,
}

impl SelectorArgs<'_> {
    /// `<self> --preview {1}:::{2}:::…:::{6}`; fzf quotes each placeholder and
    /// the shell joins them back into one argument.
    pub fn preview_command(&self) -> String {
        let fields: Vec<String> = (1..=PREVIEW_COLUMNS).map(|i| format!("{{{i}}}")).collect();
        format!(
            "{} --preview {}",
            shell_escape(&self.self_exe.to_string_lossy()),
            fields.join(DELIMITER)
        )
    }

    /// Key binding that pipes the command column into the clipboard, then
    /// closes the selector.
    pub fn yank_binding(&self) -> Option<String> {
        self.config
            .clipboard
            .as_deref()
            .map(|clip| format!("ctrl-y:execute-silent(echo -n {{1}} | {clip})+abort"))
    }

    pub fn to_args(&self) -> Vec<String> {
        let yank = self.yank_binding();
        let header = if yank.is_some() { HEADER } else { HEADER_NO_YANK };

        let mut args: Vec<String> = [
            "--tac",
            "--ansi",
            "--scheme",
            "history",
            "--prompt",
            PROMPT,
            "--header",
            header,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        args.extend([
            "--preview".to_string(),
            self.preview_command(),
            "--preview-window".to_string(),
            self.config.preview_window.clone(),
            "--delimiter".to_string(),
            DELIMITER.to_string(),
            "--with-nth".to_string(),
            "{1}  {6} {7}".to_string(),
            "--accept-nth".to_string(),
            "{1}".to_string(),
        ]);
        if let Some(binding) = yank {
            args.extend(["--bind".to_string(), binding]);
        }
        args.extend([
            "--query".to_string(),
            self.query.to_string(),
            "--height".to_string(),
            self.config.height.clone(),
        ]);
        args
    }
}

/// Run the selector with `input` as its stdin and the terminal as stdout and
/// stderr. Blocks until the operator is done.
///
/// # Errors
///
/// Returns [`SelectorError::Launch`] when the selector cannot be spawned and
/// [`SelectorError::Failed`] for an exit status that is not success, no-match
/// or abort.
pub fn run(
    program: &str,
    args: &[String],
    input: impl Into<Stdio>,
) -> Result<SelectionOutcome, SelectorError> {
    tracing::debug!(program, "starting selector");
    // The Command holds its own copy of `input`; it must be dropped right after
    // spawning so the selector is the only reader left on the pipe.
    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(input)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd.spawn().map_err(|source| {
            SelectorError::Launch(LaunchError {
                program: program.to_string(),
                source,
            })
        })?
    };

    let status = child.wait().map_err(|source| {
        SelectorError::Failed(WaitError::Io {
            program: program.to_string(),
            source,
        })
    })?;

    match check_status(program, status) {
        Ok(()) => Ok(SelectionOutcome::Selected),
        Err(WaitError::Exit { code, .. }) if code == EXIT_NO_MATCH => {
            Ok(SelectionOutcome::NoMatch)
        }
        Err(WaitError::Exit { code, .. }) if code == EXIT_INTERRUPTED => {
            Ok(SelectionOutcome::Aborted)
        }
        Err(e) => Err(SelectorError::Failed(e)),
    }
}
