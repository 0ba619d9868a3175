//! Web search backing poster lookups
//!
//! Uses the DuckDuckGo HTML endpoint, which needs no API key.

use super::fetch::browser_client;
use super::PosterError;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Returns result URLs for a query, best match first
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// At most `limit` result URLs for `query`; may be empty
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, PosterError>;
}

/// Scrapes DuckDuckGo's HTML results page
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    /// Create a search client whose requests give up after `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_endpoint(DUCKDUCKGO_HTML_URL, timeout)
    }

    /// Search against a different results endpoint
    #[must_use]
    pub fn with_endpoint(endpoint: &str, timeout: Duration) -> Self {
        Self {
            client: browser_client(timeout),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchEngine for DuckDuckGoSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, PosterError> {
        let url = Url::parse_with_params(&self.endpoint, &[("q", query)])
            .map_err(|e| PosterError::InvalidUrl(e.to_string()))?;
        debug!(query = %query, limit, "DuckDuckGo search");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PosterError::Status(status.as_u16()));
        }

        let html = response.text().await?;
        parse_results(&html, limit)
    }
}

/// Extract result URLs from a DuckDuckGo HTML page
///
/// # Errors
///
/// Returns `PosterError::Parse` if the result selector cannot be built.
pub fn parse_results(html: &str, limit: usize) -> Result<Vec<String>, PosterError> {
    let selector =
        Selector::parse("a.result__a").map_err(|e| PosterError::Parse(e.to_string()))?;
    let document = Html::parse_document(html);

    let mut results: Vec<String> = Vec::new();
    for href in document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
    {
        if results.len() >= limit {
            break;
        }
        if let Some(target) = unwrap_result_link(href) {
            if !results.contains(&target) {
                results.push(target);
            }
        }
    }
    Ok(results)
}

/// Resolve a result anchor to its target URL.
///
/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`; direct
/// http(s) links are passed through.
#[must_use]
pub fn unwrap_result_link(href: &str) -> Option<String> {
    let base = Url::parse("https://duckduckgo.com").ok()?;
    let url = base.join(href.trim()).ok()?;

    if url.host_str().is_some_and(|host| host.ends_with("duckduckgo.com")) && url.path() == "/l/"
    {
        let (_, target) = url.query_pairs().find(|(key, _)| key == "uddg")?;
        let target = Url::parse(&target).ok()?;
        return matches!(target.scheme(), "http" | "https").then(|| target.to_string());
    }

    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <div class="result">
          <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fplay.google.com%2Fstore%2Fapps%2Fdetails%3Fid%3Dcom.chess&amp;rut=abc">Chess - Play and Learn</a>
        </div>
        <div class="result">
          <a class="result__a" href="https://www.chess.com/">Chess.com</a>
        </div>
        <div class="result">
          <a class="result__a" href="javascript:void(0)">Ad</a>
        </div>
        <div class="result">
          <a class="result__a" href="https://play.google.com/store/apps/dev?id=1">Chess.com dev</a>
        </div>
    "#;

    #[test]
    fn test_unwrap_redirect_link() {
        assert_eq!(
            unwrap_result_link(
                "//duckduckgo.com/l/?uddg=https%3A%2F%2Fplay.google.com%2Fstore%2Fapps%2Fdetails%3Fid%3Dcom.chess&rut=abc"
            )
            .as_deref(),
            Some("https://play.google.com/store/apps/details?id=com.chess")
        );
    }

    #[test]
    fn test_unwrap_direct_link() {
        assert_eq!(
            unwrap_result_link("https://www.chess.com/").as_deref(),
            Some("https://www.chess.com/")
        );
        assert_eq!(unwrap_result_link("javascript:void(0)"), None);
        assert_eq!(unwrap_result_link("//duckduckgo.com/l/?rut=abc"), None);
    }

    #[test]
    fn test_parse_results_in_order() -> Result<(), PosterError> {
        let results = parse_results(RESULTS_PAGE, 10)?;
        assert_eq!(
            results,
            vec![
                "https://play.google.com/store/apps/details?id=com.chess".to_string(),
                "https://www.chess.com/".to_string(),
                "https://play.google.com/store/apps/dev?id=1".to_string(),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_parse_results_respects_limit() -> Result<(), PosterError> {
        let results = parse_results(RESULTS_PAGE, 1)?;
        assert_eq!(results.len(), 1);
        assert!(parse_results("<html></html>", 3)?.is_empty());
        Ok(())
    }
}
