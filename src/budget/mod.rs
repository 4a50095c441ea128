//! Context-window budgeting.
//!
//! Converts a model's advertised context length (in tokens) into a
//! per-segment character budget. Introspection failures never abort a
//! review; the policy's default context length is used instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::providers::ModelCatalog;

/// Ratio and margins used to turn tokens into characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetPolicy {
    /// Rough number of characters per model token.
    pub chars_per_token: usize,
    /// Characters reserved for instructions and the model's answer.
    pub safety_margin_chars: usize,
    /// Context length assumed when the model cannot be introspected.
    pub default_context_tokens: usize,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            safety_margin_chars: 1000,
            default_context_tokens: 4096,
        }
    }
}

impl BudgetPolicy {
    /// Character budget for a context of `tokens` tokens.
    pub fn budget_for(&self, tokens: u64) -> usize {
        let tokens = usize::try_from(tokens).unwrap_or(usize::MAX);
        tokens
            .saturating_mul(self.chars_per_token)
            .saturating_sub(self.safety_margin_chars)
    }

    /// Budget used when the context length is unknown.
    pub fn default_budget(&self) -> usize {
        self.budget_for(self.default_context_tokens as u64)
    }
}

/// Resolves a model's character budget by asking the catalog.
#[derive(Clone)]
pub struct ContextBudgetResolver {
    catalog: Arc<dyn ModelCatalog>,
    policy: BudgetPolicy,
}

impl ContextBudgetResolver {
    pub fn new(catalog: Arc<dyn ModelCatalog>, policy: BudgetPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Character budget for `model`. Never fails.
    pub async fn resolve(&self, model: &str) -> usize {
        match self.catalog.show_model(model).await {
            Ok(details) => match details.context_length() {
                Some(tokens) => {
                    let budget = self.policy.budget_for(tokens);
                    tracing::debug!(model, tokens, budget, "resolved context budget");
                    budget
                }
                None => {
                    tracing::warn!(model, "model reports no context length, using default budget");
                    self.policy.default_budget()
                }
            },
            Err(e) => {
                tracing::warn!(model, error = %e, "could not introspect model, using default budget");
                self.policy.default_budget()
            }
        }
    }
}
