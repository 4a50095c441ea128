//! Prompt assembly.
//!
//! Templates are embedded via `include_str!` so they ship with the binary.

use crate::models::PromptSegment;

const INSTRUCTIONS_MD: &str = include_str!("templates/instructions.md");
const CONTEXT_MD: &str = include_str!("templates/context.md");
const CLOSING_MD: &str = include_str!("templates/closing.md");
const SYSTEM_MD: &str = include_str!("templates/system.md");

/// The fixed system instruction sent ahead of every review.
pub fn system_prompt() -> &'static str {
    SYSTEM_MD.trim_end()
}

/// Build the ordered prompt segments for one review.
///
/// Instructions come first, then the description, then one segment per
/// file patch, then the closing request.
pub fn assemble(title: &str, description: &str, file_segments: &[String]) -> Vec<PromptSegment> {
    let mut segments = Vec::with_capacity(file_segments.len() + 3);
    segments.push(INSTRUCTIONS_MD.trim_end().replace("{title}", title));
    segments.push(CONTEXT_MD.trim_end().replace("{description}", description));
    segments.extend(file_segments.iter().cloned());
    segments.push(CLOSING_MD.trim_end().to_string());
    segments
}
