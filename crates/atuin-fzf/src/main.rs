use clap::Parser;
use tracing_subscriber::EnvFilter;

use atuin_fzf::Mode;
use atuin_fzf::config::Config;

#[derive(Parser)]
#[command(
    name = "atuin-fzf",
    version,
    about = "Search atuin shell history with fzf"
)]
struct Cli {
    /// Render the preview pane for one `:::`-separated selector row and exit
    #[arg(
        long,
        value_name = "RECORD",
        num_args = 0..=1,
        allow_hyphen_values = true
    )]
    preview: Option<Option<String>>,

    /// Log pipeline details to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Initial query for the search box
    #[arg(allow_hyphen_values = true)]
    query: Option<String>,
}

impl Cli {
    fn into_mode(self) -> Mode {
        match self.preview {
            Some(record) => Mode::Preview { record },
            None => Mode::Search {
                query: self.query.unwrap_or_default(),
            },
        }
    }
}

/// Returns `true` if `ATUIN_FZF_VERBOSE` is set to a truthy value. The preview
/// process is started by fzf and never sees our flags, only the environment.
fn env_verbose() -> bool {
    std::env::var("ATUIN_FZF_VERBOSE")
        .ok()
        .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

/// Diagnostics go to stderr; stdout carries the selection or the preview.
/// `ATUIN_FZF_LOG` takes an `EnvFilter` directive and wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "atuin_fzf=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("ATUIN_FZF_LOG").unwrap_or_else(|_| default.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose || env_verbose());

    let mode = cli.into_mode();
    let config = Config::load();
    let exit_code = atuin_fzf::run(&mode, &config).unwrap_or_else(|e| {
        eprintln!("[atuin-fzf] error: {e:#}");
        1
    });
    std::process::exit(exit_code);
}
