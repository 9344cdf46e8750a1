//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the HTTP client with user agent and timeouts
//! - GET requests with optional query parameters
//! - Bounded retry of every non-200 outcome

use crate::config::CrawlerConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Every attempt failed; the caller treats the URL as having no data
    Exhausted {
        /// Number of HTTP requests made
        attempts: u32,
        /// Description of the last failure
        last_error: String,
    },
}

impl FetchResult {
    /// Returns the body of a successful fetch
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Builds an HTTP client with the configured user agent and timeouts
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrying GET fetcher shared by every crawl stage
///
/// Cloning is cheap: the underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            max_retries,
            retry_delay,
        }
    }

    /// Builds a fetcher from crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client(config)?,
            config.max_retries,
            Duration::from_millis(config.retry_delay_ms),
        ))
    }

    /// Fetches a URL, retrying anything but a 200 response
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200, body read | Success |
    /// | Any other status | Retry |
    /// | Transport error or body read error | Retry |
    /// | Attempt index > `max_retries` | Log and return `Exhausted` |
    ///
    /// With `max_retries = 3` that is at most 4 requests. Retries are
    /// immediate unless a retry delay is configured.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to request
    /// * `query` - Query parameters appended to the URL, e.g. `[("page", "2")]`
    ///
    /// # Returns
    ///
    /// * `FetchResult::Success` - The body and the URL it was served from after redirects
    /// * `FetchResult::Exhausted` - Every attempt failed; the caller treats the URL as empty
    pub async fn fetch(&self, url: &str, query: &[(&str, String)]) -> FetchResult {
        let mut last_error = String::new();

        for retry in 0..=self.max_retries {
            if retry > 0 {
                tracing::debug!("Retry {} for {}: {}", retry, url, last_error);
                if !self.retry_delay.is_zero() {
                    tokio::time::sleep(self.retry_delay).await;
                }
            }

            match self.attempt(url, query).await {
                Ok(result) => {
                    if let FetchResult::Success {
                        final_url,
                        status_code,
                        body,
                    } = &result
                    {
                        tracing::trace!(
                            "Fetched {} (HTTP {}, {} bytes)",
                            final_url,
                            status_code,
                            body.len()
                        );
                    }
                    return result;
                }
                Err(error) => last_error = error,
            }
        }

        let attempts = self.max_retries + 1;
        tracing::error!(
            "Giving up on {} after {} attempts: {}",
            url,
            attempts,
            last_error
        );
        FetchResult::Exhausted {
            attempts,
            last_error,
        }
    }

    /// Makes a single request; `Err` carries the reason it should be retried
    async fn attempt(&self, url: &str, query: &[(&str, String)]) -> Result<FetchResult, String> {
        let request = self
            .client
            .get(url)
            .query(query)
            .build()
            .map_err(describe_error)?;
        let requested_url = request.url().clone();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(describe_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        if response.url() != &requested_url {
            tracing::debug!("{} redirected to {}", requested_url, response.url());
        }
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(describe_error)?;

        Ok(FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Classifies a transport error for logging
fn describe_error(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
