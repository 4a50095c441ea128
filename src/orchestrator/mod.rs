//! Review orchestrator: cache lookup, diff-to-prompt pipeline, streaming.
//!
//! One orchestrator serves one change: its [`DiffSource`] yields that
//! change's diff. Runs for different models (or reruns of the same model)
//! may overlap; [`GenerationTracker`] decides which of them may still
//! write the cache and reach the display.

pub mod generation;
pub mod session;
pub mod state;

use std::sync::Arc;

use thiserror::Error;

use crate::budget::ContextBudgetResolver;
use crate::cache::{CacheEntry, CacheKey, ResultCache};
use crate::diff::{self, DiffError, DiffSource, ExclusionFilter};
use crate::inference::{InferenceClient, StreamObserver};
use crate::models::{PromptSegment, ReviewRequest};
use crate::prompt;

pub use generation::{GenerationTracker, RunTicket};
pub use session::ReviewSession;
pub use state::{ReviewDisplay, ReviewState, ViewModel};

/// Errors that stop a run before inference starts.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Diff(#[from] DiffError),
}

/// How a review call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub key: CacheKey,
    /// `Done` or `Failed`.
    pub state: ReviewState,
    /// Displayed text: review, streamed error text, or failure message.
    pub text: String,
    pub from_cache: bool,
    /// A newer run of the same key started first, so this one was not cached.
    pub superseded: bool,
}

struct PreparedRun {
    segments: Vec<PromptSegment>,
    warning: Option<String>,
}

/// Runs reviews for one change.
pub struct ReviewOrchestrator {
    diff_source: Arc<dyn DiffSource>,
    filter: ExclusionFilter,
    resolver: ContextBudgetResolver,
    inference: InferenceClient,
    cache: ResultCache,
    display: Arc<dyn ReviewDisplay>,
    generations: Arc<GenerationTracker>,
}

impl ReviewOrchestrator {
    pub fn new(
        diff_source: Arc<dyn DiffSource>,
        filter: ExclusionFilter,
        resolver: ContextBudgetResolver,
        inference: InferenceClient,
        cache: ResultCache,
        display: Arc<dyn ReviewDisplay>,
    ) -> Self {
        Self {
            diff_source,
            filter,
            resolver,
            inference,
            cache,
            display,
            generations: Arc::new(GenerationTracker::default()),
        }
    }

    /// Show the cached review for `model`, or run one.
    ///
    /// An in-progress marker left by an unfinished run counts as a miss.
    pub async fn open(&self, request: &ReviewRequest, model: &str) -> ReviewOutcome {
        let key = CacheKey::new(&request.change_id, model);
        self.generations.select(key.clone());
        self.show_selected(&key, ReviewState::CacheLookup, "");

        match self.cache.get(&key) {
            Some(CacheEntry::Ready(text)) => {
                tracing::debug!(%key, "cache hit");
                self.show_selected(&key, ReviewState::CacheHit, "");
                self.show_selected(&key, ReviewState::Rendering, &text);
                self.show_selected(&key, ReviewState::Done, &text);
                return ReviewOutcome {
                    key,
                    state: ReviewState::Done,
                    text,
                    from_cache: true,
                    superseded: false,
                };
            }
            Some(CacheEntry::InProgress) => {
                tracing::debug!(%key, "found unfinished run marker, treating as cache miss");
            }
            None => tracing::debug!(%key, "cache miss"),
        }

        self.full_run(request, key).await
    }

    /// Drop the cached review for `model` and run again.
    pub async fn rerun(&self, request: &ReviewRequest, model: &str) -> ReviewOutcome {
        let key = CacheKey::new(&request.change_id, model);
        tracing::info!(%key, "rerunning review");
        self.generations.select(key.clone());
        self.cache.invalidate(&key);
        self.full_run(request, key).await
    }

    /// Select another model and show its review.
    ///
    /// A still-streaming run for the previous model keeps going and may
    /// cache its result, but no longer reaches the display.
    pub async fn switch_model(&self, request: &ReviewRequest, model: &str) -> ReviewOutcome {
        tracing::info!(model, "switching model");
        self.open(request, model).await
    }

    async fn full_run(&self, request: &ReviewRequest, key: CacheKey) -> ReviewOutcome {
        let ticket = self.generations.begin(&key);
        self.generations
            .commit(&ticket, || self.cache.set(&key, CacheEntry::InProgress));
        self.show_run(&ticket, ReviewState::CacheMiss, "");

        match self.prepare(request, &ticket).await {
            Ok(prepared) => self.stream(prepared, ticket).await,
            Err(e) => self.fail(ticket, e),
        }
    }

    async fn prepare(
        &self,
        request: &ReviewRequest,
        ticket: &RunTicket,
    ) -> Result<PreparedRun, OrchestratorError> {
        self.show_run(ticket, ReviewState::Parsing, "");
        let raw = self.diff_source.load().await?;
        let changes = diff::parse_change_set(&raw, &self.filter);
        if changes.is_empty() {
            // Title, description and closing still go out on their own.
            tracing::warn!(key = %ticket.key, "no reviewable files left after filtering");
        } else {
            tracing::debug!(files = changes.len(), "parsed change set");
        }

        self.show_run(ticket, ReviewState::Budgeting, "");
        let budget = self.resolver.resolve(&ticket.key.model).await;
        let patch = diff::budget_patches(&changes, budget);

        self.show_run(ticket, ReviewState::Assembling, "");
        let segments = prompt::assemble(&request.title, &request.description, &patch.segments);
        Ok(PreparedRun {
            segments,
            warning: patch.warning(),
        })
    }

    async fn stream(&self, prepared: PreparedRun, ticket: RunTicket) -> ReviewOutcome {
        self.show_run(&ticket, ReviewState::Streaming, "");
        let mut observer = ViewObserver {
            display: Arc::clone(&self.display),
            generations: Arc::clone(&self.generations),
            ticket: ticket.clone(),
        };
        let run = self
            .inference
            .run(&prepared.segments, &ticket.key.model, &mut observer)
            .await;

        let text = diff::compose_output(&run.accumulated_text, prepared.warning.as_deref());
        self.show_run(&ticket, ReviewState::Rendering, &text);

        let committed = self.generations.commit(&ticket, || {
            self.cache.set(&ticket.key, CacheEntry::Ready(text.clone()));
        });
        if committed {
            self.show_run(&ticket, ReviewState::Cached, &text);
        } else {
            tracing::debug!(key = %ticket.key, "run was superseded, discarding its result");
        }
        self.show_run(&ticket, ReviewState::Done, &text);

        ReviewOutcome {
            key: ticket.key,
            state: ReviewState::Done,
            text,
            from_cache: false,
            superseded: !committed,
        }
    }

    fn fail(&self, ticket: RunTicket, error: OrchestratorError) -> ReviewOutcome {
        tracing::warn!(key = %ticket.key, error = %error, "review failed");
        let text = error.to_string();
        let committed = self
            .generations
            .commit(&ticket, || self.cache.invalidate(&ticket.key));
        self.show_run(&ticket, ReviewState::Failed, &text);

        ReviewOutcome {
            key: ticket.key,
            state: ReviewState::Failed,
            text,
            from_cache: false,
            superseded: !committed,
        }
    }

    fn show_selected(&self, key: &CacheKey, state: ReviewState, body: &str) {
        if self.generations.is_selected(key) {
            self.display.show(&ViewModel::new(key.clone(), state, body));
        }
    }

    fn show_run(&self, ticket: &RunTicket, state: ReviewState, body: &str) {
        show_if_visible(&*self.display, &self.generations, ticket, state, body);
    }
}

fn show_if_visible(
    display: &dyn ReviewDisplay,
    generations: &GenerationTracker,
    ticket: &RunTicket,
    state: ReviewState,
    body: &str,
) {
    if generations.is_visible(ticket) {
        display.show(&ViewModel::new(ticket.key.clone(), state, body));
    }
}

/// Forwards streaming progress to the display while the run is visible.
struct ViewObserver {
    display: Arc<dyn ReviewDisplay>,
    generations: Arc<GenerationTracker>,
    ticket: RunTicket,
}

impl StreamObserver for ViewObserver {
    fn on_progress(&mut self, accumulated: &str) {
        show_if_visible(
            &*self.display,
            &self.generations,
            &self.ticket,
            ReviewState::Streaming,
            accumulated,
        );
    }

    fn on_complete(&mut self) {
        tracing::trace!(key = %self.ticket.key, "stream complete");
    }
}
