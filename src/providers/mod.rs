//! Model server protocol: catalog introspection and streaming chat.
//!
//! Two small traits split the server into what the budget resolver needs
//! ([`ModelCatalog`]) and what the inference client needs
//! ([`ChatTransport`]), so each side can be mocked on its own.

pub mod ollama;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::CONTEXT_LENGTH_SUFFIX;

pub use ollama::OllamaClient;

/// Errors from talking to the model server.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to model server failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode model server response: {0}")]
    Decode(String),

    #[error("no models available")]
    NoModels,
}

/// Raw response body chunks of a streaming call.
pub type ByteStream = BoxStream<'static, Result<Bytes, ProviderError>>;

/// A chat message with role and content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of a chat call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// One entry of the installed model list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelSummary {
    pub name: String,
}

/// Model metadata; only the architecture info map is kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub model_info: IndexMap<String, serde_json::Value>,
}

impl ModelDetails {
    /// First `context_length` entry in server order with an unsigned value.
    ///
    /// Keys are architecture-qualified (`llama.context_length`), so any key
    /// ending in `.context_length` counts.
    pub fn context_length(&self) -> Option<u64> {
        self.model_info.iter().find_map(|(key, value)| {
            let matches = key == CONTEXT_LENGTH_SUFFIX
                || key
                    .strip_suffix(CONTEXT_LENGTH_SUFFIX)
                    .is_some_and(|prefix| prefix.ends_with('.'));
            if matches { value.as_u64() } else { None }
        })
    }
}

/// Installed models and their metadata.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelSummary>, ProviderError>;
    async fn show_model(&self, model: &str) -> Result<ModelDetails, ProviderError>;
}

/// Opens a streaming chat call and hands back the raw body stream.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ProviderError>;
}

/// Find an installed model by exact name or by its `:latest`-less form.
pub fn find_model<'a>(models: &'a [ModelSummary], name: &str) -> Option<&'a ModelSummary> {
    models
        .iter()
        .find(|m| m.name == name || m.name.strip_suffix(":latest") == Some(name))
}

/// Pick the model to use from what the server has installed.
///
/// The preferred model wins when installed (a bare name also matches its
/// `:latest` tag); otherwise the first listed model is used.
pub fn select_model(models: &[ModelSummary], preferred: Option<&str>) -> Result<String, ProviderError> {
    let first = models.first().ok_or(ProviderError::NoModels)?;

    let Some(preferred) = preferred else {
        return Ok(first.name.clone());
    };

    match find_model(models, preferred) {
        Some(model) => Ok(model.name.clone()),
        None => {
            tracing::warn!(
                preferred,
                fallback = %first.name,
                "preferred model is not installed, using the first available model"
            );
            Ok(first.name.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn models(names: &[&str]) -> Vec<ModelSummary> {
        names
            .iter()
            .map(|n| ModelSummary {
                name: n.to_string(),
            })
            .collect()
    }

    fn details(value: serde_json::Value) -> ModelDetails {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn context_length_from_architecture_key() {
        let d = details(json!({"model_info": {"general.architecture": "llama", "llama.context_length": 8192}}));
        assert_eq!(d.context_length(), Some(8192));
    }

    #[test]
    fn context_length_takes_first_in_server_order() {
        // Raw text keeps key order; `json!` would sort the keys.
        let d: ModelDetails = serde_json::from_str(
            r#"{"model_info": {"qwen2.context_length": 32768, "llama.context_length": 8192}}"#,
        )
        .unwrap();
        assert_eq!(d.context_length(), Some(32768));
    }

    #[test]
    fn context_length_skips_non_integer_values() {
        let d = details(json!({"model_info": {"a.context_length": "big", "b.context_length": 2048}}));
        assert_eq!(d.context_length(), Some(2048));
    }

    #[test]
    fn context_length_ignores_lookalike_keys() {
        let d = details(json!({"model_info": {"llama.max_context_length": 9000}}));
        assert_eq!(d.context_length(), None);
    }

    #[test]
    fn missing_model_info_is_empty() {
        assert_eq!(details(json!({})).context_length(), None);
    }

    #[test]
    fn select_preferred_when_installed() {
        let list = models(&["mistral:7b", "llama3.1:latest"]);
        assert_eq!(select_model(&list, Some("llama3.1")).unwrap(), "llama3.1:latest");
        assert_eq!(select_model(&list, Some("mistral:7b")).unwrap(), "mistral:7b");
    }

    #[test]
    fn select_falls_back_to_first() {
        let list = models(&["mistral:7b", "llama3.1:latest"]);
        assert_eq!(select_model(&list, Some("phi3")).unwrap(), "mistral:7b");
        assert_eq!(select_model(&list, None).unwrap(), "mistral:7b");
    }

    #[test]
    fn select_without_models_fails() {
        assert!(matches!(select_model(&[], None), Err(ProviderError::NoModels)));
    }
}
