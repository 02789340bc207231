//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests to fetch listing and game pages
//! - Bounded retry for transient failures
//! - Error classification into fetch failure kinds

use crate::config::{FetchConfig, SourceConfig};
use crate::crawler::backoff::{retry_with_backoff, RetryPolicy};
use crate::state::FailureKind;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Terminal outcome of a failed page fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true if another attempt might succeed
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry |
    /// | Network error | Retry |
    /// | HTTP 429 | Retry |
    /// | HTTP 5xx | Retry |
    /// | Other HTTP status | Fail immediately |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Network(_) => true,
            Self::HttpStatus(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(code)
            }
        }
    }

    /// Reason tag recorded in the failed set
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::FetchTimeout,
            Self::HttpStatus(_) => FailureKind::FetchHttpError,
            Self::Network(_) => FailureKind::FetchNetworkError,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Retrieves the body of a URL
///
/// Implementations own their retry behavior; an `Err` is terminal.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `source` - Supplies the user agent string
/// * `fetch` - Supplies the request and connect timeouts
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use gamevault::config::{FetchConfig, SourceConfig};
/// use gamevault::crawler::build_http_client;
///
/// let client = build_http_client(&SourceConfig::default(), &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(source: &SourceConfig, fetch: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(source.user_agent.clone())
        .timeout(fetch.timeout())
        .connect_timeout(fetch.connect_timeout())
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`PageFetcher`] with bounded retry
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher from the `[source]` and `[fetch]` sections
    pub fn from_config(source: &SourceConfig, fetch: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            build_http_client(source, fetch)?,
            RetryPolicy::from_config(fetch),
        ))
    }

    /// One GET request without retry
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let result = retry_with_backoff(&self.policy, FetchError::is_retryable, |_| {
            self.fetch_once(url)
        })
        .await;

        if let Err(e) = &result {
            debug!(url, error = %e, "Fetch failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&SourceConfig::default(), &FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Network("reset".to_string()).is_retryable());
        assert!(FetchError::HttpStatus(429).is_retryable());
        assert!(FetchError::HttpStatus(500).is_retryable());
        assert!(FetchError::HttpStatus(503).is_retryable());

        assert!(!FetchError::HttpStatus(404).is_retryable());
        assert!(!FetchError::HttpStatus(403).is_retryable());
        assert!(!FetchError::HttpStatus(301).is_retryable());
    }

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(FetchError::Timeout.failure_kind(), FailureKind::FetchTimeout);
        assert_eq!(
            FetchError::HttpStatus(404).failure_kind(),
            FailureKind::FetchHttpError
        );
        assert_eq!(
            FetchError::Network("dns".to_string()).failure_kind(),
            FailureKind::FetchNetworkError
        );
    }

    // Request-level behavior is exercised against wiremock in tests/http.rs
}
