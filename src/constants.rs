//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and server defaults so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "diffsage";

/// Crate version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.diffsage.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".diffsage.toml";

/// Directory name under `~/.config/` for global config and cache.
pub const CONFIG_DIR: &str = "diffsage";

/// Default Ollama server address.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:11434";

/// Model-info key suffix carrying the context window size in tokens.
pub const CONTEXT_LENGTH_SUFFIX: &str = "context_length";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_SERVER: &str = "DIFFSAGE_SERVER";
pub const ENV_MODEL: &str = "DIFFSAGE_MODEL";
pub const ENV_CACHE: &str = "DIFFSAGE_CACHE";
pub const ENV_LOG: &str = "DIFFSAGE_LOG";
