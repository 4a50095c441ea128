//! Run generations: which in-flight run may still publish.
//!
//! Every run of a key bumps that key's generation. A run may write the
//! cache only while its generation is the latest for the key, and may
//! reach the display only while, in addition, its key is the selected one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cache::CacheKey;

/// Identifies one run of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTicket {
    pub key: CacheKey,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct GenerationState {
    latest: HashMap<CacheKey, u64>,
    selected: Option<CacheKey>,
}

/// Tracks the latest generation per key and the selected key.
///
/// Commits are serialized on their own lock, so the state lock is only
/// ever held for a map lookup and visibility checks never wait on a
/// commit's cache write.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    state: Mutex<GenerationState>,
    commits: Mutex<()>,
}

impl GenerationTracker {
    fn lock(&self) -> MutexGuard<'_, GenerationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new run of `key`, superseding any earlier one.
    pub fn begin(&self, key: &CacheKey) -> RunTicket {
        let mut state = self.lock();
        let generation = state.latest.entry(key.clone()).or_insert(0);
        *generation += 1;
        RunTicket {
            key: key.clone(),
            generation: *generation,
        }
    }

    fn is_current(&self, ticket: &RunTicket) -> bool {
        self.lock().latest.get(&ticket.key) == Some(&ticket.generation)
    }

    /// Run `f` only if `ticket` is still current.
    ///
    /// A run that begins after the check has its own commits queued behind
    /// this one, so a superseded write can never land after a newer one.
    pub fn commit<F: FnOnce()>(&self, ticket: &RunTicket, f: F) -> bool {
        let _turn = self.commits.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(ticket) {
            return false;
        }
        f();
        true
    }

    /// Mark `key` as the one the user is looking at.
    pub fn select(&self, key: CacheKey) {
        self.lock().selected = Some(key);
    }

    pub fn is_selected(&self, key: &CacheKey) -> bool {
        self.lock().selected.as_ref() == Some(key)
    }

    /// Current and selected.
    pub fn is_visible(&self, ticket: &RunTicket) -> bool {
        let state = self.lock();
        state.latest.get(&ticket.key) == Some(&ticket.generation)
            && state.selected.as_ref() == Some(&ticket.key)
    }
}
