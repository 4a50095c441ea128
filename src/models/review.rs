//! Review request types.

use serde::{Deserialize, Serialize};

/// One prompt message. Downstream stages never merge or reorder segments.
pub type PromptSegment = String;

/// What the reviewer is looking at: a change plus its author-provided text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Stable identifier of the change (usually the diff URL or path).
    pub change_id: String,
    /// Title of the pull or merge request.
    pub title: String,
    /// Free-text description, usually markdown.
    pub description: String,
}

impl ReviewRequest {
    pub fn new(
        change_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            change_id: change_id.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}
