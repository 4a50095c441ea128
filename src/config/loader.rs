//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.diffsage.toml` in the working directory
//! 4. `~/.config/diffsage/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::budget::BudgetPolicy;
use crate::constants::{DEFAULT_SERVER_URL, ENV_CACHE, ENV_MODEL, ENV_SERVER};
use crate::env::Env;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub budget: BudgetPolicy,
    pub diff: DiffConfig,
    pub cache: CacheConfig,
}

/// Model server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    /// Preferred model; the first installed model is used when unset.
    pub model: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            model: None,
        }
    }
}

/// Diff filtering configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Extra path fragments to exclude, on top of the built-in lockfiles.
    pub exclude: Vec<String>,
}

/// Result cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, then the local config in `local_dir`,
    /// then applies environment variable overrides.
    pub fn load(local_dir: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        Self::load_from(global.as_deref(), local_dir, env)
    }

    fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
        env: &Env,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let global = Self::load_file(global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: local config
        if let Some(dir) = local_dir {
            let local_path = dir.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        let default_server = ServerConfig::default();
        if other.server.url != default_server.url {
            self.server.url = other.server.url;
        }
        if other.server.model.is_some() {
            self.server.model = other.server.model;
        }

        let default_budget = BudgetPolicy::default();
        if other.budget.chars_per_token != default_budget.chars_per_token {
            self.budget.chars_per_token = other.budget.chars_per_token;
        }
        if other.budget.safety_margin_chars != default_budget.safety_margin_chars {
            self.budget.safety_margin_chars = other.budget.safety_margin_chars;
        }
        if other.budget.default_context_tokens != default_budget.default_context_tokens {
            self.budget.default_context_tokens = other.budget.default_context_tokens;
        }

        // Exclusions accumulate across layers.
        for name in other.diff.exclude {
            if !self.diff.exclude.contains(&name) {
                self.diff.exclude.push(name);
            }
        }

        // Disabled overrides enabled
        if !other.cache.enabled {
            self.cache.enabled = false;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.get(ENV_SERVER) {
            self.server.url = val;
        }
        if let Some(val) = env.get(ENV_MODEL) {
            self.server.model = Some(val);
        }
        match env.flag(ENV_CACHE) {
            Some(Ok(enabled)) => self.cache.enabled = enabled,
            Some(Err(val)) => eprintln!("Warning: ignoring invalid {ENV_CACHE} value: {val}"),
            None => {}
        }
    }
}
