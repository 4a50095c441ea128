//! Diff engine: fetching, unified diff parsing, exclusion and budgeting.

pub mod budget;
pub mod filter;
pub mod parser;
pub mod source;

use std::sync::Arc;

use thiserror::Error;

use crate::models::{ChangeSet, InputMode};

pub use budget::{BudgetedPatch, budget_patches, compose_output, render_file_change};
pub use filter::ExclusionFilter;
pub use source::{DiffSource, FileDiffSource, StaticDiffSource, UrlDiffSource};

/// Errors from loading a diff.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("failed to fetch diff from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching diff from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read diff file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("path not found: {0}")]
    PathNotFound(String),
}

/// Strip binary payloads, parse, and drop excluded files.
pub fn parse_change_set(raw: &str, filter: &ExclusionFilter) -> ChangeSet {
    let stripped = parser::strip_binary_patches(raw);
    let files = parser::parse_unified_diff(&stripped);
    filter.apply(files)
}

/// Build the diff source for an input mode.
///
/// Stdin is drained here, once, so interactive reruns can reuse the text.
pub async fn source_for(
    input: &InputMode,
    client: reqwest::Client,
) -> Result<Arc<dyn DiffSource>, DiffError> {
    Ok(match input {
        InputMode::DiffUrl(url) => Arc::new(UrlDiffSource::new(client, url.clone())),
        InputMode::DiffFile(path) => Arc::new(FileDiffSource::new(path.clone())),
        InputMode::Stdin => Arc::new(StaticDiffSource::new(source::read_diff_stdin().await?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKFILE_AND_CODE: &str = "diff --git a/package-lock.json b/package-lock.json\n--- a/package-lock.json\n+++ b/package-lock.json\n@@ -1 +1 @@\n-{}\n+{\"v\":2}\ndiff --git a/src/app.ts b/src/app.ts\n--- a/src/app.ts\n+++ b/src/app.ts\n@@ -1 +1 @@\n-let a = 1;\n+const a = 1;\n";

    #[test]
    fn change_set_drops_lockfiles() {
        let set = parse_change_set(LOCKFILE_AND_CODE, &ExclusionFilter::default());
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].path(), "src/app.ts");
    }

    #[test]
    fn change_set_without_filter_keeps_all() {
        let set = parse_change_set(LOCKFILE_AND_CODE, &ExclusionFilter::none());
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn source_for_diff_file() {
        let dir = tempfile::tempdir().unwrap();
        let diff_path = dir.path().join("test.diff");
        std::fs::write(&diff_path, LOCKFILE_AND_CODE).unwrap();

        let source = source_for(&InputMode::DiffFile(diff_path), reqwest::Client::new())
            .await
            .unwrap();
        let set = parse_change_set(&source.load().await.unwrap(), &ExclusionFilter::default());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn source_for_missing_file_fails_on_load() {
        let input = InputMode::DiffFile(std::path::PathBuf::from("/tmp/diffsage_nonexistent.diff"));
        let source = source_for(&input, reqwest::Client::new()).await.unwrap();
        assert!(matches!(source.load().await, Err(DiffError::PathNotFound(_))));
    }
}
