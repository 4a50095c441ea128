//! Path-based exclusion of generated files.

use crate::models::diff::{ChangeSet, FileChange};

/// Lockfiles and similar generated manifests that drown out a review.
pub const DEFAULT_EXCLUDED: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lock",
    "composer.lock",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "Pipfile.lock",
    "uv.lock",
    "go.sum",
    "flake.lock",
    "mix.lock",
    "pubspec.lock",
    "deno.lock",
    "packages.lock.json",
];

/// Drops file changes whose path contains any of a set of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionFilter {
    names: Vec<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self {
            names: DEFAULT_EXCLUDED.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExclusionFilter {
    /// A filter that keeps everything.
    pub fn none() -> Self {
        Self { names: Vec::new() }
    }

    /// Add user-configured names on top of the current set.
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            let name = name.into();
            if !name.is_empty() && !self.names.contains(&name) {
                self.names.push(name);
            }
        }
        self
    }

    /// True when either side of the change names an excluded file.
    ///
    /// Both sides are checked: a freshly added lockfile has `/dev/null` as
    /// its old path.
    pub fn is_excluded(&self, change: &FileChange) -> bool {
        change
            .paths()
            .any(|path| self.names.iter().any(|name| path.contains(name.as_str())))
    }

    /// Keep the non-excluded changes, preserving order.
    pub fn apply(&self, changes: Vec<FileChange>) -> ChangeSet {
        changes
            .into_iter()
            .filter(|change| {
                let excluded = self.is_excluded(change);
                if excluded {
                    tracing::debug!(path = change.path(), "excluding generated file from review");
                }
                !excluded
            })
            .collect()
    }
}
