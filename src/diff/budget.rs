//! Patch rendering and character budgeting.
//!
//! Each file change is re-serialized as a fenced `diff` block and cut to
//! the character budget derived from the model's context window. Whether
//! anything was cut travels in the returned [`BudgetedPatch`].

use crate::models::diff::FileChange;

/// Separator between model output and an appended truncation warning.
const WARNING_SEPARATOR: &str = " \n\n";

/// Per-file patch segments after budgeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetedPatch {
    /// One rendered segment per file change, in order.
    pub segments: Vec<String>,
    /// Whether at least one segment was cut.
    pub truncated: bool,
    /// The character budget that was applied.
    pub budget: usize,
}

impl BudgetedPatch {
    /// A single human-readable warning when any segment was truncated.
    pub fn warning(&self) -> Option<String> {
        self.truncated.then(|| {
            format!(
                "Some parts of your patch were truncated as it was larger than {} characters. \
                 The review might not be as complete.",
                self.budget
            )
        })
    }
}

/// Render one file change as a fenced diff block.
pub fn render_file_change(change: &FileChange) -> String {
    let mut out = String::from("```diff\n");

    let from = change.from_path.as_deref();
    let to = change.to_path.as_deref();
    // The `a`/`b` markers touch the stored, prefix-free paths.
    if let (Some(from), Some(to)) = (from, to) {
        out.push_str(&format!("diff --git a{from} b{to}\n"));
    }

    if change.is_new_file {
        if let Some(mode) = &change.new_file_mode {
            out.push_str(&format!("new file mode {mode}\n"));
        }
    }

    if let Some(from) = from {
        out.push_str(&format!("--- {from}\n"));
    }
    if let Some(to) = to {
        out.push_str(&format!("+++ {to}\n"));
    }

    let body = change
        .chunks
        .iter()
        .flat_map(|chunk| chunk.lines.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join("\n");
    if !body.is_empty() {
        out.push_str(&body);
        out.push('\n');
    }

    out.push_str("```");
    out
}

/// Render every change and cut each segment to at most `budget` characters.
pub fn budget_patches(changes: &[FileChange], budget: usize) -> BudgetedPatch {
    let mut truncated = false;
    let segments = changes
        .iter()
        .map(|change| {
            let rendered = render_file_change(change);
            match truncate_chars(&rendered, budget) {
                Some(cut) => {
                    tracing::debug!(path = change.path(), budget, "truncating patch segment");
                    truncated = true;
                    cut
                }
                None => rendered,
            }
        })
        .collect();

    BudgetedPatch {
        segments,
        truncated,
        budget,
    }
}

/// Returns the first `max` characters when `text` is longer than that.
fn truncate_chars(text: &str, max: usize) -> Option<String> {
    let (cut_at, _) = text.char_indices().nth(max)?;
    Some(text[..cut_at].to_string())
}

/// Final display text: model output plus the truncation warning, if any.
pub fn compose_output(answer: &str, warning: Option<&str>) -> String {
    match warning {
        Some(warning) => format!("{answer}{WARNING_SEPARATOR}{warning}"),
        None => answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::diff::{Chunk, DEV_NULL};
    use pretty_assertions::assert_eq;

    fn modified(path: &str, lines: &[&str]) -> FileChange {
        FileChange {
            from_path: Some(path.to_string()),
            to_path: Some(path.to_string()),
            chunks: vec![Chunk {
                lines: lines.iter().map(|l| l.to_string()).collect(),
            }],
            ..FileChange::default()
        }
    }

    #[test]
    fn render_modified_file() {
        let change = modified("src/lib.rs", &[" a", "-b", "+c"]);
        assert_eq!(
            render_file_change(&change),
            "```diff\ndiff --git asrc/lib.rs bsrc/lib.rs\n--- src/lib.rs\n+++ src/lib.rs\n a\n-b\n+c\n```"
        );
    }

    #[test]
    fn render_new_file_keeps_dev_null_verbatim() {
        let change = FileChange {
            from_path: Some(DEV_NULL.to_string()),
            to_path: Some("new.rs".to_string()),
            is_new_file: true,
            new_file_mode: Some("100644".to_string()),
            chunks: vec![Chunk {
                lines: vec!["+fn x() {}".to_string()],
            }],
        };
        assert_eq!(
            render_file_change(&change),
            "```diff\ndiff --git a/dev/null bnew.rs\nnew file mode 100644\n--- /dev/null\n+++ new.rs\n+fn x() {}\n```"
        );
    }

    #[test]
    fn render_joins_lines_across_chunks() {
        let mut change = modified("x.rs", &["-a"]);
        change.chunks.push(Chunk {
            lines: vec!["+b".to_string()],
        });
        assert!(render_file_change(&change).contains("-a\n+b\n"));
    }

    #[test]
    fn render_without_paths_is_just_the_fence() {
        let change = FileChange::default();
        assert_eq!(render_file_change(&change), "```diff\n```");
    }

    #[test]
    fn small_segments_are_untouched() {
        let patch = budget_patches(&[modified("a.rs", &["+x"])], 10_000);
        assert!(!patch.truncated);
        assert_eq!(patch.warning(), None);
        assert!(patch.segments[0].ends_with("```"));
    }

    #[test]
    fn segment_exactly_at_budget_is_not_truncated() {
        let change = modified("a.rs", &["+x"]);
        let len = render_file_change(&change).chars().count();
        let patch = budget_patches(&[change], len);
        assert!(!patch.truncated);
    }

    #[test]
    fn every_segment_fits_and_warning_is_single() {
        let long: Vec<String> = (0..200).map(|i| format!("+line number {i}")).collect();
        let long: Vec<&str> = long.iter().map(String::as_str).collect();
        let changes = vec![modified("a.rs", &long), modified("b.rs", &long)];

        let patch = budget_patches(&changes, 100);
        assert!(patch.truncated);
        assert_eq!(patch.segments.len(), 2);
        assert!(patch.segments.iter().all(|s| s.chars().count() == 100));
        assert_eq!(
            patch.warning().as_deref(),
            Some(
                "Some parts of your patch were truncated as it was larger than 100 characters. \
                 The review might not be as complete."
            )
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let change = modified("ü.rs", &["+äöü"]);
        let patch = budget_patches(&[change], 12);
        assert_eq!(patch.segments[0].chars().count(), 12);
    }

    #[test]
    fn compose_appends_warning_after_separator() {
        assert_eq!(compose_output("LGTM", Some("cut")), "LGTM \n\ncut");
        assert_eq!(compose_output("LGTM", None), "LGTM");
    }
}
