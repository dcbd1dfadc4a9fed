//! HTTP client utilities.

use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::sources::SourceError;

/// Maximum number of redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Shared HTTP client used by both catalog sources and the downloader.
///
/// Timeout, redirect policy and `User-Agent` are fixed at construction.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    probe_timeout: Duration,
}

impl HttpClient {
    /// Create a client from the engine configuration
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            probe_timeout: config.probe_timeout(),
        })
    }

    /// GET a URL and fail on transport errors or non-success statuses
    pub async fn get(&self, url: &str) -> Result<Response, SourceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        Ok(response)
    }

    /// GET a URL and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response body: {}", e)))
    }

    /// Lightweight reachability check with the shorter probe timeout
    pub async fn probe(&self, url: &str) -> Result<(), SourceError> {
        let response = self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SourceError::Status(status.as_u16()))
        }
    }
}
