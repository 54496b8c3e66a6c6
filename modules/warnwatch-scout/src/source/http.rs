use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use warnwatch_common::{SourceConfig, WatchError};

use crate::traits::DocumentSource;

/// Fetches the filings page and report over HTTP with per-request timeouts.
pub struct HttpSource {
    client: reqwest::Client,
    page_timeout: Duration,
    download_timeout: Duration,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            page_timeout: Duration::from_secs(config.page_timeout_secs),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
        }
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, WatchError> {
        let fetch_err = |message: String| WatchError::Fetch {
            url: url.to_string(),
            message,
        };

        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        Ok(resp)
    }
}

#[async_trait]
impl DocumentSource for HttpSource {
    async fn page(&self, url: &str) -> Result<String> {
        info!(url, "Fetching filings page");
        let resp = self.get(url, self.page_timeout).await?;
        let text = resp.text().await.map_err(|e| WatchError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(text)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        info!(url, "Downloading report");
        let resp = self.get(url, self.download_timeout).await?;
        let bytes = resp.bytes().await.map_err(|e| WatchError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        info!(url, bytes = bytes.len(), "Report downloaded");
        Ok(bytes.to_vec())
    }
}
