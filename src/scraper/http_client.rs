use crate::config::SourceConfig;
use crate::error::PaxError;
use anyhow::{Context, Result};
use tracing::debug;

/// Thin wrapper over `reqwest::Client`. One GET per call, no retries.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { inner })
    }

    /// Fetch a URL as text. Non-2xx statuses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String, PaxError> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|source| PaxError::Fetch { url: url.to_string(), source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PaxError::Status { url: url.to_string(), status });
        }

        resp.text()
            .await
            .map_err(|source| PaxError::Fetch { url: url.to_string(), source })
    }
}
