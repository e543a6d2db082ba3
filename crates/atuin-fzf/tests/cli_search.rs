#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Three records; the last one ran in the directory the test runs from.
const FAKE_ATUIN: &str = r#"#!/bin/sh
printf 'ls -la:::0:::/tmp:::5ms:::1m ago\n'
printf 'make:::2:::/repo:::3s:::2m ago\n'
printf 'pwd:::0:::%s:::1ms:::3m ago\n' "$(pwd -P)"
"#;

/// Records its arguments and stdin, then exits with `$FAKE_FZF_EXIT`.
const FAKE_FZF: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$FAKE_FZF_DIR/args"
cat > "$FAKE_FZF_DIR/input"
exit "${FAKE_FZF_EXIT:-0}"
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(atuin: &str, fzf: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        write_script(&dir.path().join("atuin"), atuin);
        write_script(&dir.path().join("fzf"), fzf);
        std::fs::create_dir(dir.path().join("home")).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_atuin-fzf"));
        cmd.current_dir(self.path())
            .env("ATUIN_FZF_HOME", self.path().join("home"))
            .env("ATUIN_FZF_BACKEND", self.path().join("atuin"))
            .env("ATUIN_FZF_SELECTOR", self.path().join("fzf"))
            .env("ATUIN_FZF_CLIPBOARD", "cat")
            .env("FAKE_FZF_DIR", self.path())
            .env_remove("ATUIN_FZF_LOG");
        cmd
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path().join(name)).unwrap()
    }

    fn cwd(&self) -> PathBuf {
        std::fs::canonicalize(self.path()).unwrap()
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn selector_receives_enriched_records_in_order() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().output().unwrap();
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let input = fx.read("input");
    let lines: Vec<&str> = input.lines().collect();
    assert_eq!(lines.len(), 3);

    let fields: Vec<Vec<&str>> = lines.iter().map(|l| l.split(":::").collect()).collect();
    assert!(fields.iter().all(|f| f.len() == 7));
    assert_eq!(fields[0][0], "ls -la");
    assert_eq!(fields[1][0], "make");
    assert_eq!(fields[2][0], "pwd");

    assert!(fields[0][5].trim().is_empty());
    assert!(fields[1][5].contains("exit 2"));
    assert!(fields[2][5].trim().is_empty());

    assert!(fields[0][6].is_empty());
    assert!(fields[1][6].is_empty());
    assert!(fields[2][6].contains("(current dir)"));
    assert_eq!(fields[2][2], fx.cwd().to_string_lossy());
}

#[test]
fn selector_gets_query_and_columns() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().arg("git").output().unwrap();
    assert!(out.status.success());

    let args = fx.read("args");
    let args: Vec<&str> = args.lines().collect();
    let after = |flag: &str| {
        let i = args.iter().position(|a| *a == flag).unwrap();
        args[i + 1]
    };
    assert_eq!(after("--query"), "git");
    assert_eq!(after("--delimiter"), ":::");
    assert_eq!(after("--with-nth"), "{1}  {6} {7}");
    assert_eq!(after("--accept-nth"), "{1}");
    assert_eq!(
        after("--bind"),
        "ctrl-y:execute-silent(echo -n {1} | cat)+abort"
    );
    assert!(after("--preview").contains("--preview {1}:::{2}:::{3}:::{4}:::{5}:::{6}"));
}

#[test]
fn no_argument_means_empty_query() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().output().unwrap();
    assert!(out.status.success());
    let args = fx.read("args");
    let args: Vec<&str> = args.lines().collect();
    let i = args.iter().position(|a| *a == "--query").unwrap();
    assert_eq!(args.get(i + 1), Some(&""));
}

#[test]
fn user_abort_propagates_130_silently() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().env("FAKE_FZF_EXIT", "130").output().unwrap();
    assert_eq!(out.status.code(), Some(130));
    assert!(!String::from_utf8_lossy(&out.stderr).contains("error"));
}

#[test]
fn no_match_propagates_1_silently() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().env("FAKE_FZF_EXIT", "1").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&out.stderr).contains("error"));
}

#[test]
fn selector_failure_is_reported() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx.cmd().env("FAKE_FZF_EXIT", "2").output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("[atuin-fzf] error: run selector"), "{stderr}");
    assert!(stderr.contains("exited with status 2"), "{stderr}");
}

#[test]
fn backend_failure_is_reported() {
    let fx = Fixture::new("#!/bin/sh\necho 'db locked' >&2\nexit 3\n", FAKE_FZF);
    let out = fx.cmd().output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("db locked"), "{stderr}");
    assert!(stderr.contains("exited with status 3"), "{stderr}");
}

#[test]
fn missing_backend_is_reported() {
    let fx = Fixture::new(FAKE_ATUIN, FAKE_FZF);
    let out = fx
        .cmd()
        .env("ATUIN_FZF_BACKEND", fx.path().join("no-such-atuin"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("[atuin-fzf] error: history search: start"), "{stderr}");
}

#[test]
fn malformed_backend_line_is_reported_after_selector() {
    let fx = Fixture::new(
        "#!/bin/sh\nprintf 'ok:::0:::/:::1s:::t\\nbroken:::1\\n'\n",
        FAKE_FZF,
    );
    let out = fx.cmd().output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(fx.read("input").lines().count(), 1);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("history line 2"), "{stderr}");
}

#[test]
fn selector_closing_early_does_not_hang_or_fail() {
    let endless = r#"#!/bin/sh
i=0
while [ "$i" -lt 200000 ]; do
  printf 'echo %s:::0:::/:::1ms:::now\n' "$i"
  i=$((i + 1))
done
"#;
    let first_line_only = "#!/bin/sh\nhead -n 1 > \"$FAKE_FZF_DIR/input\"\n";
    let fx = Fixture::new(endless, first_line_only);

    let start = Instant::now();
    let out = fx.cmd().output().unwrap();
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(fx.read("input").starts_with("echo 0:::"));
}
