//! Shared types used across all modules.
//!
//! This module defines the core data structures for parsed diffs and
//! review requests. Other modules import from here rather than reaching
//! into each other's internals.

pub mod diff;
pub mod review;

use std::path::PathBuf;

use sha2::{Digest, Sha256};

pub use diff::{ChangeSet, Chunk, FileChange};
pub use review::{PromptSegment, ReviewRequest};

/// Where the raw diff text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Fetch the diff over HTTP.
    DiffUrl(String),
    /// Read a pre-computed unified diff from a file.
    DiffFile(PathBuf),
    /// Read a unified diff from stdin.
    Stdin,
}

impl InputMode {
    /// Default change identifier for a diff read from this input.
    ///
    /// The input's own name is suffixed with a digest of the raw diff, so a
    /// branch that moves on or a different patch piped through stdin never
    /// hits a stale cache entry.
    pub fn default_change_id(&self, raw: &str) -> String {
        let base = match self {
            InputMode::DiffUrl(url) => url.clone(),
            InputMode::DiffFile(path) => path.display().to_string(),
            InputMode::Stdin => "stdin".to_string(),
        };
        format!("{base}#{}", content_digest(raw))
    }
}

/// Short hex SHA-256 of the diff text.
fn content_digest(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(&digest[..CHANGE_DIGEST_BYTES])
}

const CHANGE_DIGEST_BYTES: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "--- a/x\n+++ b/x\n@@ -1 +1 @@\n-a\n+b\n";

    #[test]
    fn default_change_id_starts_with_url() {
        let mode = InputMode::DiffUrl("https://example.com/pr/7.diff".into());
        let id = mode.default_change_id(PATCH);
        assert!(id.starts_with("https://example.com/pr/7.diff#"));
        assert_eq!(id.len(), "https://example.com/pr/7.diff#".len() + 16);
    }

    #[test]
    fn default_change_id_for_file_starts_with_path() {
        let mode = InputMode::DiffFile(PathBuf::from("changes/fix.diff"));
        assert!(mode.default_change_id(PATCH).starts_with("changes/fix.diff#"));
    }

    #[test]
    fn stdin_change_id_follows_content() {
        let first = InputMode::Stdin.default_change_id(PATCH);
        let again = InputMode::Stdin.default_change_id(PATCH);
        let other = InputMode::Stdin.default_change_id("--- a/y\n+++ b/y\n");
        assert!(first.starts_with("stdin#"));
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn same_url_with_new_content_gets_new_id() {
        let mode = InputMode::DiffUrl("https://example.com/pr/7.diff".into());
        assert_ne!(
            mode.default_change_id(PATCH),
            mode.default_change_id(&format!("{PATCH}+c\n"))
        );
    }
}
