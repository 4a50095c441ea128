//! Interactive review session: one request, a changing model selection.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::{ReviewOrchestrator, ReviewOutcome};
use crate::models::ReviewRequest;

/// Binds a [`ReviewRequest`] to the currently selected model.
///
/// Every action runs on its own task, so a model switch or rerun can start
/// while an earlier run is still streaming. The session owns those tasks
/// until [`ReviewSession::drain`] collects them.
pub struct ReviewSession {
    orchestrator: Arc<ReviewOrchestrator>,
    request: ReviewRequest,
    model: String,
    runs: JoinSet<ReviewOutcome>,
}

impl ReviewSession {
    pub fn new(
        orchestrator: Arc<ReviewOrchestrator>,
        request: ReviewRequest,
        model: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            request,
            model: model.into(),
            runs: JoinSet::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Runs that have not been collected yet.
    pub fn pending(&self) -> usize {
        self.runs.len()
    }

    /// Show the review for the current model.
    pub fn open(&mut self) {
        let (orchestrator, request, model) = self.parts();
        self.runs
            .spawn(async move { orchestrator.open(&request, &model).await });
    }

    /// Rerun the current model, bypassing the cache.
    pub fn rerun(&mut self) {
        let (orchestrator, request, model) = self.parts();
        self.runs
            .spawn(async move { orchestrator.rerun(&request, &model).await });
    }

    /// Select `model` and show its review.
    pub fn switch_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        let (orchestrator, request, model) = self.parts();
        self.runs
            .spawn(async move { orchestrator.switch_model(&request, &model).await });
    }

    /// Wait for every spawned run and return their outcomes in completion order.
    pub async fn drain(&mut self) -> Vec<ReviewOutcome> {
        let mut outcomes = Vec::with_capacity(self.runs.len());
        while let Some(result) = self.runs.join_next().await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "review task panicked"),
            }
        }
        outcomes
    }

    fn parts(&self) -> (Arc<ReviewOrchestrator>, ReviewRequest, String) {
        (
            Arc::clone(&self.orchestrator),
            self.request.clone(),
            self.model.clone(),
        )
    }
}
