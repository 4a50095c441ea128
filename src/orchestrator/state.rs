//! Review lifecycle states and the view projected from them.

use strum::Display;

use crate::cache::CacheKey;

/// Where a review currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReviewState {
    Idle,
    CacheLookup,
    CacheHit,
    CacheMiss,
    Parsing,
    Budgeting,
    Assembling,
    Streaming,
    Rendering,
    Cached,
    Done,
    Failed,
}

impl ReviewState {
    /// No further transitions follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReviewState::Done | ReviewState::Failed)
    }
}

/// What a display needs to draw one moment of a review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub key: CacheKey,
    pub state: ReviewState,
    /// Text to show: partial or final output, or an error message.
    pub body: String,
    pub rerun_available: bool,
}

impl ViewModel {
    pub fn new(key: CacheKey, state: ReviewState, body: impl Into<String>) -> Self {
        Self {
            key,
            state,
            body: body.into(),
            rerun_available: state.is_terminal(),
        }
    }
}

/// A surface that renders review views.
pub trait ReviewDisplay: Send + Sync {
    fn show(&self, view: &ViewModel);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_snake_case() {
        assert_eq!(ReviewState::CacheLookup.to_string(), "cache_lookup");
        assert_eq!(ReviewState::Done.to_string(), "done");
    }

    #[test]
    fn rerun_only_offered_at_rest() {
        let key = CacheKey::new("d", "m");
        assert!(!ViewModel::new(key.clone(), ReviewState::Streaming, "x").rerun_available);
        assert!(ViewModel::new(key.clone(), ReviewState::Done, "x").rerun_available);
        assert!(ViewModel::new(key, ReviewState::Failed, "x").rerun_available);
    }
}
