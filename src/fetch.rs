//! Page fetching
//!
//! The crawl only needs one network capability: fetch a URL and hand back
//! the body. [`HttpFetcher`] provides it over HTTP; tests substitute
//! in-memory fetchers.

use std::time::Duration;

use crate::error::{ConfigError, FetchError};

pub const DEFAULT_USER_AGENT: &str = concat!("wordcrawl/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of page bodies
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page at `url` and return its body
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default user agent and timeout
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a fetcher with a custom user agent and per-request timeout
    pub fn with_options(user_agent: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}
