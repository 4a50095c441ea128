//! Environment variable access behind a mockable seam.
//!
//! The binary reads the process environment through [`Env::real()`]; tests
//! build an [`Env::mock()`] from literal pairs so configuration layering can
//! be exercised without touching global process state.

use std::collections::HashMap;

/// Source of environment variables.
#[derive(Clone, Debug, Default)]
pub struct Env {
    fixed: Option<HashMap<String, String>>,
}

impl Env {
    /// Read from the process environment.
    pub fn real() -> Self {
        Self { fixed: None }
    }

    /// Read only from the given pairs.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            fixed: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Look up `name`, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match &self.fixed {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Parse `name` as a boolean switch.
    ///
    /// Returns `None` when unset and `Some(Err(raw))` when the value is not
    /// one of the recognised spellings, so callers can warn about it.
    pub fn flag(&self, name: &str) -> Option<Result<bool, String>> {
        let raw = self.get(name)?;
        Some(match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(raw),
        })
    }
}
