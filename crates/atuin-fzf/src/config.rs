//! Runtime configuration merged from an optional TOML file and the environment.
//!
//! Priority, highest first:
//!   1. `ATUIN_FZF_BACKEND` / `ATUIN_FZF_SELECTOR` / `ATUIN_FZF_CLIPBOARD`
//!   2. `config.toml` in the user directory (see [`user_dir`])
//!   3. Built-in defaults
//!
//! The preview pane is rendered by a child of the selector, which inherits
//! the environment, so both modes always see the same configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_BACKEND: &str = "atuin";
pub const DEFAULT_SELECTOR: &str = "fzf";
pub const DEFAULT_SEARCH_LIMIT: u32 = 1000;
pub const DEFAULT_RELATED_LIMIT: u32 = 5;

/// Clipboard commands probed in order when none is configured.
const CLIPBOARD_CANDIDATES: &[&[&str]] = &[
    &["pbcopy"],
    &["wl-copy"],
    &["xclip", "-selection", "clipboard"],
    &["xsel", "--clipboard", "--input"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// History backend executable.
    pub backend: String,
    /// Interactive selector executable.
    pub selector: String,
    pub search_limit: u32,
    /// Per-source limit for the preview's related-command queries.
    pub related_limit: u32,
    pub height: String,
    pub preview_window: String,
    /// Shell command that receives the yanked command on stdin.
    /// `None` disables the yank key binding.
    pub clipboard: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            selector: DEFAULT_SELECTOR.to_string(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            related_limit: DEFAULT_RELATED_LIMIT,
            height: "80%".to_string(),
            preview_window: "right:40%:wrap".to_string(),
            clipboard: None,
        }
    }
}

/// Private: on-disk shape, every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    backend: Option<String>,
    selector: Option<String>,
    search_limit: Option<u32>,
    related_limit: Option<u32>,
    height: Option<String>,
    preview_window: Option<String>,
    clipboard: Option<String>,
}

/// Returns the atuin-fzf user directory.
///
/// `ATUIN_FZF_HOME` (when set and non-empty) wins over
/// `dirs::config_dir().map(|d| d.join("atuin-fzf"))`.
pub fn user_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("ATUIN_FZF_HOME")
        && !home.is_empty()
    {
        return Some(PathBuf::from(home));
    }
    dirs::config_dir().map(|d| d.join("atuin-fzf"))
}

/// Path of the optional config file.
pub fn config_path() -> Option<PathBuf> {
    user_dir().map(|d| d.join("config.toml"))
}

fn read_file_config(path: &Path) -> Option<FileConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("ignoring unreadable config {}: {e}", path.display());
            return None;
        }
    };
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!("ignoring invalid config {}: {e}", path.display());
            None
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Pick the first clipboard command available on `PATH`.
pub fn detect_clipboard() -> Option<String> {
    CLIPBOARD_CANDIDATES
        .iter()
        .find(|argv| which::which(argv[0]).is_ok())
        .map(|argv| argv.join(" "))
}

impl Config {
    /// Load using the auto-detected config path and the process environment.
    pub fn load() -> Self {
        Self::load_from(config_path().as_deref())
    }

    /// Load from an explicit file path (or none), then apply env overrides.
    pub fn load_from(path: Option<&Path>) -> Self {
        let mut config = Self::default();
        if let Some(file) = path.and_then(read_file_config) {
            config.apply_file(file);
        }

        if let Some(backend) = env_non_empty("ATUIN_FZF_BACKEND") {
            config.backend = backend;
        }
        if let Some(selector) = env_non_empty("ATUIN_FZF_SELECTOR") {
            config.selector = selector;
        }
        if let Some(clipboard) = env_non_empty("ATUIN_FZF_CLIPBOARD") {
            config.clipboard = Some(clipboard);
        }
        if config.clipboard.is_none() {
            config.clipboard = detect_clipboard();
        }

        tracing::debug!(?config, "configuration loaded");
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.backend {
            self.backend = v;
        }
        if let Some(v) = file.selector {
            self.selector = v;
        }
        if let Some(v) = file.search_limit {
            self.search_limit = v;
        }
        if let Some(v) = file.related_limit {
            self.related_limit = v;
        }
        if let Some(v) = file.height {
            self.height = v;
        }
        if let Some(v) = file.preview_window {
            self.preview_window = v;
        }
        if let Some(v) = file.clipboard.filter(|c| !c.is_empty()) {
            self.clipboard = Some(v);
        }
    }
}
