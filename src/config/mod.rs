//! Configuration loading and layering.
//!
//! Handles `.diffsage.toml` loading, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{CacheConfig, Config, ConfigError, DiffConfig, ServerConfig};
