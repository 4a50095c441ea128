//! Diff-related types: per-file changes and their hunks.

use serde::{Deserialize, Serialize};

/// Path used by unified diffs for the missing side of an add or delete.
pub const DEV_NULL: &str = "/dev/null";

/// A contiguous hunk of a file change.
///
/// Lines keep their leading `+`, `-` or space marker exactly as they
/// appeared in the diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub lines: Vec<String>,
}

/// The diff of a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Old path without the `a/` prefix (`/dev/null` for added files).
    pub from_path: Option<String>,
    /// New path without the `b/` prefix (`/dev/null` for deleted files).
    pub to_path: Option<String>,
    /// Whether the diff declares `new file mode`.
    pub is_new_file: bool,
    /// The mode from the `new file mode` header, if any.
    pub new_file_mode: Option<String>,
    /// Hunks in diff order.
    pub chunks: Vec<Chunk>,
}

impl FileChange {
    /// Returns the most relevant path: the new path unless the file was deleted.
    pub fn path(&self) -> &str {
        match (self.to_path.as_deref(), self.from_path.as_deref()) {
            (Some(to), _) if to != DEV_NULL => to,
            (_, Some(from)) => from,
            (Some(to), None) => to,
            (None, None) => "",
        }
    }

    /// Iterates over both recorded paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.from_path
            .as_deref()
            .into_iter()
            .chain(self.to_path.as_deref())
    }
}

/// Files of one diff, in original order, after exclusion filtering.
pub type ChangeSet = Vec<FileChange>;

#[cfg(test)]
mod tests {
    use super::*;

    fn change(from: Option<&str>, to: Option<&str>) -> FileChange {
        FileChange {
            from_path: from.map(String::from),
            to_path: to.map(String::from),
            ..FileChange::default()
        }
    }

    #[test]
    fn path_prefers_new_side() {
        assert_eq!(change(Some("old.rs"), Some("new.rs")).path(), "new.rs");
    }

    #[test]
    fn path_of_deleted_file_is_old_side() {
        assert_eq!(change(Some("gone.rs"), Some(DEV_NULL)).path(), "gone.rs");
    }

    #[test]
    fn path_of_added_file_is_new_side() {
        assert_eq!(change(Some(DEV_NULL), Some("added.rs")).path(), "added.rs");
    }

    #[test]
    fn paths_skips_unknown_sides() {
        let c = change(None, Some("b.rs"));
        assert_eq!(c.paths().collect::<Vec<_>>(), vec!["b.rs"]);
    }
}
