//! Descriptor fetchers: HTTP for real sessions, a local file for testing layouts

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use arvos_core::DescriptorFetcher;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GETs the descriptor from the configured server
pub struct HttpDescriptorFetcher {
    client: reqwest::Client,
}

impl HttpDescriptorFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DescriptorFetcher for HttpDescriptorFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("Request to '{}' failed: {}", url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("Request to '{}' failed ({})", url, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response from '{}': {}", url, e))?;
        debug!(bytes = body.len(), "descriptor downloaded");
        Ok(body)
    }
}

/// Serves the descriptor from a local file, ignoring the request parameters
pub struct FileDescriptorFetcher {
    path: PathBuf,
}

impl FileDescriptorFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DescriptorFetcher for FileDescriptorFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, path = %self.path.display(), "reading local descriptor");
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read descriptor {}", self.path.display()))
    }
}
