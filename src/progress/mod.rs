//! Terminal rendering of review views.
//!
//! Review text streams to stdout as deltas so it can be piped. Lifecycle
//! status goes to stderr with colored icons and is silenced with `--quiet`.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use colored::Colorize;

use crate::cache::CacheKey;
use crate::orchestrator::{ReviewDisplay, ReviewState, ViewModel};

/// Renders [`ViewModel`]s to the terminal.
///
/// Thread-safe; runs on several tasks may report to the same view.
pub struct TerminalView {
    inner: Mutex<TerminalState>,
    /// If false, status lines are suppressed.
    status_enabled: bool,
}

#[derive(Default)]
struct TerminalState {
    /// Key whose text is currently on screen.
    key: Option<CacheKey>,
    /// Text already written to stdout for `key`.
    printed: String,
    last_state: Option<ReviewState>,
}

impl TerminalView {
    pub fn new(quiet: bool) -> Self {
        Self {
            inner: Mutex::new(TerminalState::default()),
            status_enabled: !quiet,
        }
    }

    fn status_line(state: ReviewState, key: &CacheKey) -> Option<String> {
        let model = key.model.as_str();
        let line = match state {
            ReviewState::CacheLookup => format!("{} Looking up review ({})", "▸".cyan().bold(), model.dimmed()),
            ReviewState::CacheHit => format!("{} Using cached review", "✔".green().bold()),
            ReviewState::Parsing => format!("{} Parsing diff…", "◌".cyan().bold()),
            ReviewState::Budgeting => format!("{} Sizing patch for model context…", "◌".cyan().bold()),
            ReviewState::Streaming => format!("{} Reviewing with {}…", "◌".cyan().bold(), model),
            ReviewState::Cached => format!("{} Review cached", "✔".green().bold()),
            ReviewState::Done => format!("{} {}", "✔".green().bold(), "Done.".green()),
            ReviewState::Failed => format!("{} {}", "✖".red().bold(), "Review failed".red()),
            _ => return None,
        };
        Some(line)
    }

    /// Write the part of `body` not yet shown for this key.
    fn write_delta(state: &mut TerminalState, body: &str) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match body.strip_prefix(state.printed.as_str()) {
            Some(delta) => {
                let _ = write!(out, "{delta}");
            }
            // The text was replaced (e.g. an error after partial output).
            None => {
                let _ = write!(out, "\n{body}");
            }
        }
        let _ = out.flush();
        state.printed = body.to_string();
    }
}

impl ReviewDisplay for TerminalView {
    fn show(&self, view: &ViewModel) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if state.key.as_ref() != Some(&view.key) {
            if !state.printed.is_empty() {
                println!();
            }
            state.key = Some(view.key.clone());
            state.printed.clear();
            state.last_state = None;
        }

        if self.status_enabled && state.last_state != Some(view.state) {
            if let Some(line) = Self::status_line(view.state, &view.key) {
                if !state.printed.is_empty() && !state.printed.ends_with('\n') {
                    println!();
                    state.printed.push('\n');
                }
                eprintln!("  {line}");
            }
        }
        state.last_state = Some(view.state);

        match view.state {
            ReviewState::Streaming | ReviewState::Rendering | ReviewState::Done => {
                if !view.body.is_empty() {
                    Self::write_delta(&mut state, &view.body);
                }
                if view.state == ReviewState::Done {
                    if !state.printed.ends_with('\n') {
                        println!();
                    }
                    state.key = None;
                    state.printed.clear();
                }
            }
            ReviewState::Failed => {
                eprintln!("{}", view.body.red());
                state.key = None;
                state.printed.clear();
            }
            _ => {}
        }
    }
}
