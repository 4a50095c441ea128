//! Clap argument types and validation.

use clap::Parser;
use std::path::PathBuf;

pub use diffsage::models::InputMode;

/// Local-LLM code review for pull request diffs.
#[derive(Parser, Debug)]
#[command(name = "diffsage", version = diffsage::constants::VERSION)]
pub struct Cli {
    /// Log debug output to stderr (overrides DIFFSAGE_LOG).
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Review a diff with a local model.
    Review(Box<ReviewArgs>),

    /// List models installed on the server.
    Models(ModelsArgs),

    /// Manage the result cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print version information.
    Version,
}

/// Arguments for the `models` subcommand.
#[derive(Parser, Debug)]
pub struct ModelsArgs {
    /// Model server base URL.
    #[arg(long)]
    pub server: Option<String>,
}

/// Cache management subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum CacheAction {
    /// Remove all cached review results.
    Clear,
    /// Show cache statistics (entry count and size).
    Stats,
    /// Print the cache directory path.
    Path,
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug, Default)]
pub struct ReviewArgs {
    // --- Input (one required) ---
    /// URL to fetch the unified diff from (e.g. a pull request's .diff link).
    #[arg(long)]
    pub diff_url: Option<String>,

    /// Pre-computed unified diff file.
    #[arg(long)]
    pub diff_file: Option<PathBuf>,

    /// Read unified diff from stdin.
    #[arg(long, default_value_t = false)]
    pub diff_stdin: bool,

    // --- Change description ---
    /// Title of the change.
    #[arg(long, default_value = "")]
    pub title: String,

    /// Description of the change (markdown).
    #[arg(long, conflicts_with = "description_file")]
    pub description: Option<String>,

    /// Read the description from a file.
    #[arg(long)]
    pub description_file: Option<PathBuf>,

    /// Cache identity of the change (defaults to the diff URL or path plus a content hash).
    #[arg(long)]
    pub change_id: Option<String>,

    // --- Model ---
    /// Model to review with (defaults to config, then the first installed model).
    #[arg(long)]
    pub model: Option<String>,

    /// Model server base URL.
    #[arg(long)]
    pub server: Option<String>,

    // --- Cache ---
    /// Ignore any cached review and run again.
    #[arg(long, default_value_t = false)]
    pub rerun: bool,

    /// Disable result caching.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    // --- Session ---
    /// Keep a session open to rerun or switch models.
    #[arg(long, short = 'i', default_value_t = false, conflicts_with = "diff_stdin")]
    pub interactive: bool,

    /// Suppress status output. Only the review and errors are shown.
    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,
}

impl ReviewArgs {
    /// Validate that exactly one input source is provided.
    pub fn validate_input(&self) -> Result<InputMode, String> {
        let sources = [self.diff_url.is_some(), self.diff_file.is_some(), self.diff_stdin];
        let count = sources.iter().filter(|&&x| x).count();

        if count == 0 {
            return Err(
                "one input source is required: --diff-url, --diff-file, or --diff-stdin".to_string(),
            );
        }
        if count > 1 {
            return Err(
                "only one input source allowed: --diff-url, --diff-file, or --diff-stdin"
                    .to_string(),
            );
        }

        if let Some(ref url) = self.diff_url {
            Ok(InputMode::DiffUrl(url.clone()))
        } else if let Some(ref path) = self.diff_file {
            Ok(InputMode::DiffFile(path.clone()))
        } else {
            Ok(InputMode::Stdin)
        }
    }

    /// The change identifier used as the cache key for the diff text `raw`.
    pub fn change_id(&self, input: &InputMode, raw: &str) -> String {
        self.change_id
            .clone()
            .unwrap_or_else(|| input.default_change_id(raw))
    }
}
