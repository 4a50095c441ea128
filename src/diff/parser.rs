//! Unified diff format parser.
//!
//! Parses `git diff` output (and plain `diff -u` output) into
//! `Vec<FileChange>`, keeping every hunk line verbatim so that bounded
//! slices of it can be re-serialized into prompts later.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::diff::{Chunk, FileChange, DEV_NULL};

/// A `GIT binary patch` section up to its `literal 0` terminator.
///
/// Lazy so that text files sitting between two binary patches survive.
static BINARY_PATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)GIT\sbinary\spatch.*?literal\s0").unwrap());

/// Remove binary patch payloads, which carry no reviewable text.
pub fn strip_binary_patches(input: &str) -> Cow<'_, str> {
    BINARY_PATCH_RE.replace_all(input, "")
}

/// Parse a unified diff string into a list of file changes.
///
/// Parsing is best-effort: a file whose hunk header cannot be read is
/// dropped with a warning and the rest of the diff is still returned.
pub fn parse_unified_diff(input: &str) -> Vec<FileChange> {
    let mut files: Vec<FileChange> = Vec::new();
    let mut current: Option<FileBuilder> = None;
    let mut hunk: Option<HunkCursor> = None;
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        if let Some(cursor) = hunk.as_mut() {
            if cursor.accepts(line) {
                cursor.consume(line);
                if let Some(chunk) = current.as_mut().and_then(|f| f.chunks.last_mut()) {
                    chunk.lines.push(line.to_string());
                }
                continue;
            }
            hunk = None;
        }

        if line.starts_with("diff --git ") {
            finish(&mut files, current.take());
            current = Some(FileBuilder::from_git_header(line));
        } else if let Some(rest) = line.strip_prefix("--- ") {
            // A file header is always a `---`/`+++` pair; a lone `---` is noise.
            let Some(to_rest) = lines.peek().and_then(|next| next.strip_prefix("+++ ")) else {
                continue;
            };
            let to_path = parse_header_path(to_rest);
            lines.next();

            let starts_new_file = current
                .as_ref()
                .is_none_or(|f| f.from_path.is_some() || !f.chunks.is_empty());
            if starts_new_file {
                finish(&mut files, current.take());
                current = Some(FileBuilder::default());
            }
            if let Some(file) = current.as_mut() {
                file.from_path = Some(parse_header_path(rest));
                file.to_path = Some(to_path);
            }
        } else if let Some(mode) = line.strip_prefix("new file mode ") {
            if let Some(file) = current.as_mut() {
                file.is_new_file = true;
                file.new_file_mode = Some(mode.trim().to_string());
            }
        } else if line.starts_with("@@") {
            let Some(file) = current.as_mut() else {
                tracing::debug!(line, "hunk header outside of any file, ignoring");
                continue;
            };
            match parse_hunk_header(line) {
                Some((old_count, new_count)) => {
                    file.chunks.push(Chunk::default());
                    hunk = Some(HunkCursor {
                        old_left: old_count,
                        new_left: new_count,
                    });
                }
                None => {
                    file.malformed = true;
                }
            }
        }
        // Everything else (index, similarity, rename, stray binary data) is
        // extended header noise the prompt does not need.
    }

    finish(&mut files, current);
    files
}

/// Accumulates one file's headers and hunks while scanning.
#[derive(Default)]
struct FileBuilder {
    header_paths: Option<(String, String)>,
    from_path: Option<String>,
    to_path: Option<String>,
    is_new_file: bool,
    new_file_mode: Option<String>,
    chunks: Vec<Chunk>,
    malformed: bool,
}

impl FileBuilder {
    fn from_git_header(line: &str) -> Self {
        Self {
            header_paths: parse_diff_header(line),
            ..Self::default()
        }
    }

    fn build(self) -> Option<FileChange> {
        if self.malformed {
            tracing::warn!(
                path = self.to_path.as_deref().or(self.from_path.as_deref()).unwrap_or("?"),
                "skipping file with malformed hunk header"
            );
            return None;
        }
        let (header_from, header_to) = match self.header_paths {
            Some((from, to)) => (Some(from), Some(to)),
            None => (None, None),
        };
        Some(FileChange {
            from_path: self.from_path.or(header_from),
            to_path: self.to_path.or(header_to),
            is_new_file: self.is_new_file,
            new_file_mode: self.new_file_mode,
            chunks: self.chunks,
        })
    }
}

fn finish(files: &mut Vec<FileChange>, builder: Option<FileBuilder>) {
    if let Some(file) = builder.and_then(FileBuilder::build) {
        files.push(file);
    }
}

/// Remaining line budget of the hunk being read, taken from its `@@` header.
struct HunkCursor {
    old_left: u32,
    new_left: u32,
}

impl HunkCursor {
    fn accepts(&self, line: &str) -> bool {
        match line.as_bytes().first() {
            // "\ No newline at end of file" may trail the last counted line.
            Some(b'\\') => true,
            Some(b'+') => self.new_left > 0,
            Some(b'-') => self.old_left > 0,
            // Some tools strip the single space off blank context lines.
            Some(b' ') | None => self.old_left > 0 && self.new_left > 0,
            Some(_) => false,
        }
    }

    fn consume(&mut self, line: &str) {
        match line.as_bytes().first() {
            Some(b'+') => self.new_left -= 1,
            Some(b'-') => self.old_left -= 1,
            Some(b' ') | None => {
                self.old_left -= 1;
                self.new_left -= 1;
            }
            _ => {}
        }
    }
}

/// Parse the "diff --git a/path b/path" header line.
fn parse_diff_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?;

    // Paths are prefixed with a/ and b/ (default), or c/w/i/o/ when
    // git's diff.mnemonicPrefix is enabled.
    if let Some(b_idx) = find_second_prefix(rest) {
        let old_path = strip_diff_prefix(unquote(&rest[..b_idx]));
        let new_path = strip_diff_prefix(unquote(&rest[b_idx + 1..]));
        return Some((old_path.to_string(), new_path.to_string()));
    }

    let (a, b) = rest.split_once(' ')?;
    Some((
        strip_diff_prefix(unquote(a)).to_string(),
        strip_diff_prefix(unquote(b)).to_string(),
    ))
}

/// Parse the path of a `---` or `+++` line, dropping any timestamp.
fn parse_header_path(rest: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    let path = unquote(path);
    if path == DEV_NULL {
        return path.to_string();
    }
    strip_diff_prefix(path).to_string()
}

fn unquote(path: &str) -> &str {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
}

/// Strip a single-character git diff prefix (`a/`, `b/`, `c/`, `w/`, `i/`, `o/`).
fn strip_diff_prefix(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2
        && bytes[1] == b'/'
        && matches!(bytes[0], b'a' | b'b' | b'c' | b'w' | b'i' | b'o')
    {
        return &path[2..];
    }
    path
}

/// Find the position of the second path prefix separator in a diff header.
fn find_second_prefix(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (1..bytes.len().saturating_sub(1)).find(|&i| {
        bytes[i] == b' '
            && bytes.get(i + 2) == Some(&b'/')
            && matches!(
                bytes.get(i + 1),
                Some(b'a' | b'b' | b'c' | b'w' | b'i' | b'o')
            )
    })
}

/// Parse `@@ -old_start,old_count +new_start,new_count @@`, returning the counts.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let line = line.strip_prefix("@@ ")?;
    let end = line.find(" @@")?;
    let (old, new) = line[..end].split_once(' ')?;
    let old_count = parse_range_count(old.strip_prefix('-')?)?;
    let new_count = parse_range_count(new.strip_prefix('+')?)?;
    Some((old_count, new_count))
}

/// Parse "start,count" or "start" (count defaults to 1), returning the count.
fn parse_range_count(s: &str) -> Option<u32> {
    match s.split_once(',') {
        Some((start, count)) => {
            start.parse::<u32>().ok()?;
            count.parse().ok()
        }
        None => s.parse::<u32>().ok().map(|_| 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_DIFF: &str = r#"diff --git a/src/main.rs b/src/main.rs
index 1234567..abcdefg 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,4 +1,5 @@
 fn main() {
-    println!("Hello");
+    println!("Hello, world!");
+    println!("Goodbye!");
     let x = 42;
 }
"#;

    #[test]
    fn parse_simple_diff() {
        let files = parse_unified_diff(SAMPLE_DIFF);
        assert_eq!(files.len(), 1);

        let file = &files[0];
        assert_eq!(file.from_path.as_deref(), Some("src/main.rs"));
        assert_eq!(file.to_path.as_deref(), Some("src/main.rs"));
        assert!(!file.is_new_file);
        assert_eq!(file.chunks.len(), 1);
        assert_eq!(
            file.chunks[0].lines,
            vec![
                " fn main() {",
                "-    println!(\"Hello\");",
                "+    println!(\"Hello, world!\");",
                "+    println!(\"Goodbye!\");",
                "     let x = 42;",
                " }",
            ]
        );
    }

    #[test]
    fn parse_new_file() {
        let diff = r#"diff --git a/new_file.rs b/new_file.rs
new file mode 100644
index 0000000..1234567
--- /dev/null
+++ b/new_file.rs
@@ -0,0 +1,3 @@
+fn hello() {
+    println!("new!");
+}
"#;
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert!(files[0].is_new_file);
        assert_eq!(files[0].new_file_mode.as_deref(), Some("100644"));
        assert_eq!(files[0].from_path.as_deref(), Some(DEV_NULL));
        assert_eq!(files[0].to_path.as_deref(), Some("new_file.rs"));
        assert_eq!(files[0].chunks[0].lines.len(), 3);
    }

    #[test]
    fn parse_deleted_file() {
        let diff = r#"diff --git a/old_file.rs b/old_file.rs
deleted file mode 100644
index 1234567..0000000
--- a/old_file.rs
+++ /dev/null
@@ -1,2 +0,0 @@
-fn old() {
-}
"#;
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].to_path.as_deref(), Some(DEV_NULL));
        assert_eq!(files[0].path(), "old_file.rs");
    }

    #[test]
    fn parse_multiple_files_in_order() {
        let diff = r#"diff --git a/a.rs b/a.rs
index 1234567..abcdefg 100644
--- a/a.rs
+++ b/a.rs
@@ -1,3 +1,3 @@
 fn a() {
-    1
+    2
 }
diff --git a/b.rs b/b.rs
index 1234567..abcdefg 100644
--- a/b.rs
+++ b/b.rs
@@ -1,3 +1,3 @@
 fn b() {
-    3
+    4
 }
"#;
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path(), "a.rs");
        assert_eq!(files[1].path(), "b.rs");
    }

    #[test]
    fn parse_multiple_hunks_keep_order() {
        let diff = "diff --git a/x.rs b/x.rs\n--- a/x.rs\n+++ b/x.rs\n@@ -1,1 +1,1 @@\n-a\n+b\n@@ -10,2 +10,2 @@ fn tail() {\n c\n-d\n+e\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files[0].chunks.len(), 2);
        assert_eq!(files[0].chunks[0].lines, vec!["-a", "+b"]);
        assert_eq!(files[0].chunks[1].lines, vec![" c", "-d", "+e"]);
    }

    #[test]
    fn parse_rename_without_hunks_uses_header_paths() {
        let diff = r#"diff --git a/old_name.rs b/new_name.rs
similarity index 100%
rename from old_name.rs
rename to new_name.rs
"#;
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].from_path.as_deref(), Some("old_name.rs"));
        assert_eq!(files[0].to_path.as_deref(), Some("new_name.rs"));
        assert!(files[0].chunks.is_empty());
    }

    #[test]
    fn parse_empty_diff() {
        assert!(parse_unified_diff("").is_empty());
    }

    #[test]
    fn removed_line_starting_with_dashes_stays_in_hunk() {
        // "--- comment" removed from a SQL file must not look like a file header.
        let diff = "diff --git a/q.sql b/q.sql\n--- a/q.sql\n+++ b/q.sql\n@@ -1,2 +1,1 @@\n--- comment\n++++ banner\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].chunks[0].lines, vec!["--- comment", "++++ banner"]);
    }

    #[test]
    fn no_newline_marker_is_kept_verbatim() {
        let diff = "diff --git a/t.rs b/t.rs\n--- a/t.rs\n+++ b/t.rs\n@@ -1 +1 @@\n-old line\n+new line\n\\ No newline at end of file\n";
        let files = parse_unified_diff(diff);
        assert_eq!(
            files[0].chunks[0].lines,
            vec!["-old line", "+new line", "\\ No newline at end of file"]
        );
    }

    #[test]
    fn empty_context_line_is_preserved() {
        let diff = "diff --git a/t.rs b/t.rs\n--- a/t.rs\n+++ b/t.rs\n@@ -1,3 +1,4 @@\n fn a() {\n\n+    new_line();\n }\n";
        let files = parse_unified_diff(diff);
        assert_eq!(
            files[0].chunks[0].lines,
            vec![" fn a() {", "", "+    new_line();", " }"]
        );
    }

    #[test]
    fn malformed_hunk_header_skips_only_that_file() {
        let diff = "diff --git a/bad.rs b/bad.rs\n--- a/bad.rs\n+++ b/bad.rs\n@@ -x,y +1 @@\n+oops\ndiff --git a/good.rs b/good.rs\n--- a/good.rs\n+++ b/good.rs\n@@ -1 +1 @@\n-a\n+b\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path(), "good.rs");
    }

    #[test]
    fn plain_unified_diff_without_git_headers() {
        let diff = "--- old/a.txt\t2024-01-01 10:00:00\n+++ new/a.txt\t2024-01-02 10:00:00\n@@ -1 +1 @@\n-x\n+y\n--- old/b.txt\n+++ new/b.txt\n@@ -1 +1 @@\n-p\n+q\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].from_path.as_deref(), Some("old/a.txt"));
        assert_eq!(files[0].to_path.as_deref(), Some("new/a.txt"));
        assert_eq!(files[1].chunks[0].lines, vec!["-p", "+q"]);
    }

    #[test]
    fn parse_is_deterministic() {
        assert_eq!(parse_unified_diff(SAMPLE_DIFF), parse_unified_diff(SAMPLE_DIFF));
    }

    #[test]
    fn parse_mnemonic_prefix_cw() {
        let diff = "diff --git c/auth.rs w/auth.rs\nindex 1234567..abcdefg 100644\n--- c/auth.rs\n+++ w/auth.rs\n@@ -1,2 +1,3 @@\n fn main() {\n+    todo!();\n }\n";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].from_path.as_deref(), Some("auth.rs"));
        assert_eq!(files[0].to_path.as_deref(), Some("auth.rs"));
    }

    #[test]
    fn header_path_with_spaces() {
        assert_eq!(
            parse_diff_header("diff --git a/my file.rs b/my file.rs"),
            Some(("my file.rs".to_string(), "my file.rs".to_string()))
        );
    }

    #[test]
    fn strip_binary_patch_block() {
        let diff = "diff --git a/logo.png b/logo.png\nnew file mode 100644\nindex 0000000..1d2b3c4\nGIT binary patch\nliteral 1234\nzcmV<Data>\n\nliteral 0\nHcmV?d00001\n\ndiff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1 +1 @@\n-a\n+b\n";
        let stripped = strip_binary_patches(diff);
        assert!(!stripped.contains("GIT binary patch"));
        assert!(!stripped.contains("literal 0"));
        assert!(stripped.contains("diff --git a/a.rs b/a.rs"));

        let files = parse_unified_diff(&stripped);
        assert_eq!(files.len(), 2);
        assert!(files[0].chunks.is_empty());
        assert_eq!(files[1].chunks[0].lines, vec!["-a", "+b"]);
    }

    #[test]
    fn strip_binary_patch_is_case_insensitive_and_keeps_text_between_blocks() {
        let diff = "git BINARY patch\nliteral 5\nabc\nLITERAL 0\nkeep me\nGIT binary patch\nliteral 9\nxyz\nliteral 0\n";
        let stripped = strip_binary_patches(diff);
        assert_eq!(stripped, "\nkeep me\n\n");
    }

    #[test]
    fn strip_diff_prefix_all_variants() {
        assert_eq!(strip_diff_prefix("a/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("b/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("w/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("x/file.rs"), "x/file.rs");
        assert_eq!(strip_diff_prefix("src/file.rs"), "src/file.rs");
        assert_eq!(strip_diff_prefix("a"), "a");
        assert_eq!(strip_diff_prefix(""), "");
    }

    #[test]
    fn hunk_header_counts() {
        assert_eq!(parse_hunk_header("@@ -1,5 +1,6 @@"), Some((5, 6)));
        assert_eq!(parse_hunk_header("@@ -3 +3 @@ fn x()"), Some((1, 1)));
        assert_eq!(parse_hunk_header("@@ -0,0 +1,3 @@"), Some((0, 3)));
        assert_eq!(parse_hunk_header("@@ garbage @@"), None);
    }
}
