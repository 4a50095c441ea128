//! Ollama HTTP client.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use super::{
    ByteStream, ChatRequest, ChatTransport, ModelCatalog, ModelDetails, ModelSummary,
    ProviderError,
};

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelSummary>,
}

/// Client for a local Ollama server.
///
/// No request timeouts are configured: generation on local hardware can
/// take minutes and is bounded by the prompt budget instead.
#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing HTTP client (shares its connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ModelCatalog for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelSummary>, ProviderError> {
        let response = self.client.get(self.endpoint("tags")).send().await?;
        let response = Self::check_status(response).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(tags.models)
    }

    async fn show_model(&self, model: &str) -> Result<ModelDetails, ProviderError> {
        let response = self
            .client
            .post(self.endpoint("show"))
            .json(&serde_json::json!({ "model": model }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChatTransport for OllamaClient {
    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ProviderError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "opening chat stream"
        );
        let response = self
            .client
            .post(self.endpoint("chat"))
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::Http))
            .boxed())
    }
}
