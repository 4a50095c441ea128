//! diffsage: local-LLM code review for unified diffs (library crate).
//!
//! Re-exports public modules for integration tests and external use.

pub mod budget;
pub mod cache;
pub mod config;
pub mod constants;
pub mod diff;
pub mod env;
pub mod inference;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod prompt;
pub mod providers;
