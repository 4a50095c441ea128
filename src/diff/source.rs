//! Where raw diff text comes from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::DiffError;

/// Produces the raw unified diff for one change.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn load(&self) -> Result<String, DiffError>;
}

/// Fetches the diff over HTTP with a plain `GET`.
pub struct UrlDiffSource {
    client: reqwest::Client,
    url: String,
}

impl UrlDiffSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl DiffSource for UrlDiffSource {
    async fn load(&self) -> Result<String, DiffError> {
        tracing::debug!(url = %self.url, "fetching diff");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| DiffError::Fetch {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiffError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| DiffError::Fetch {
            url: self.url.clone(),
            source,
        })
    }
}

/// Reads a pre-computed diff from disk on every load.
pub struct FileDiffSource {
    path: PathBuf,
}

impl FileDiffSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DiffSource for FileDiffSource {
    async fn load(&self) -> Result<String, DiffError> {
        read_diff_file(&self.path).await
    }
}

/// A diff that was already read, e.g. from stdin.
pub struct StaticDiffSource {
    text: String,
}

impl StaticDiffSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl DiffSource for StaticDiffSource {
    async fn load(&self) -> Result<String, DiffError> {
        Ok(self.text.clone())
    }
}

/// Read a unified diff from a file path.
pub async fn read_diff_file(path: &Path) -> Result<String, DiffError> {
    if !path.exists() {
        return Err(DiffError::PathNotFound(path.display().to_string()));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(DiffError::FileRead)
}

/// Read a unified diff from stdin.
pub async fn read_diff_stdin() -> Result<String, DiffError> {
    use tokio::io::AsyncReadExt;
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .map_err(DiffError::FileRead)?;
    Ok(buf)
}
