//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

/// Help text printed when an interactive session starts.
pub const SESSION_HELP: &str = "commands: r = rerun, m <model> = switch model, l = list models, q = quit";

/// A line typed during an interactive review session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Rerun,
    SwitchModel(String),
    ListModels,
    Quit,
    Unknown(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        Some(match (head, rest) {
            ("r" | "rerun", "") => SessionCommand::Rerun,
            ("m" | "model", name) if !name.is_empty() => SessionCommand::SwitchModel(name.to_string()),
            ("l" | "list", "") => SessionCommand::ListModels,
            ("q" | "quit" | "exit", "") => SessionCommand::Quit,
            _ => SessionCommand::Unknown(line.to_string()),
        })
    }
}
