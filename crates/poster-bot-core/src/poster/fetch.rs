//! Storefront page fetching

use super::PosterError;
use crate::config::BROWSER_USER_AGENT;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fetches raw HTML for a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of `url`; non-success statuses are errors
    async fn fetch(&self, url: &str) -> Result<String, PosterError>;
}

/// Plain HTTP fetcher with a browser User-Agent and a bounded timeout
pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

/// Build a reqwest client with the browser User-Agent and `timeout`.
///
/// Falls back to a default client if the builder fails.
pub(crate) fn browser_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

impl HttpPageFetcher {
    /// Create a fetcher whose requests give up after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: browser_client(timeout),
            timeout,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, PosterError> {
        debug!(url = %url, timeout_secs = self.timeout.as_secs(), "Fetching storefront page");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PosterError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
