//! Poster resolution
//!
//! Turns a free-text app name into the URL of the app's storefront feature
//! graphic. Resolution is best-effort: every search, fetch or parse failure
//! is logged and reported as "not found", never raised to the caller.

pub mod cache;
pub mod fetch;
pub mod matchers;
pub mod search;

pub use cache::CachedPosterResolver;
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use search::{DuckDuckGoSearch, SearchEngine};

use crate::config::{CoreSettings, SEARCH_QUERY_SUFFIX, STOREFRONT_ORIGIN};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by search and fetch collaborators
#[derive(Debug, Error)]
pub enum PosterError {
    /// Connection, TLS or body read failure
    #[error("Network error: {0}")]
    Network(String),
    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Response markup could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for PosterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Resolves an app name to a poster URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PosterResolver: Send + Sync {
    /// Absolute http(s) poster URL, or `None` if nothing was found
    async fn resolve(&self, app_name: &str) -> Option<String>;
}

/// Search query for an app name
#[must_use]
pub fn build_query(app_name: &str) -> String {
    format!("{} {SEARCH_QUERY_SUFFIX}", app_name.trim())
}

/// Poster resolver backed by a web search and the storefront's pages
pub struct StorePosterResolver<S, F> {
    search: S,
    fetcher: F,
    max_results: usize,
    strict: bool,
}

impl StorePosterResolver<DuckDuckGoSearch, HttpPageFetcher> {
    /// Resolver using DuckDuckGo and plain HTTP fetches, tuned by `settings`
    #[must_use]
    pub fn from_settings(settings: &CoreSettings) -> Self {
        let timeout = settings.http_timeout();
        Self::new(
            DuckDuckGoSearch::new(timeout),
            HttpPageFetcher::new(timeout),
            settings.search_results(),
            settings.poster_strict_match,
        )
    }
}

impl<S: SearchEngine, F: PageFetcher> StorePosterResolver<S, F> {
    /// Create a resolver from its collaborators
    #[must_use]
    pub fn new(search: S, fetcher: F, max_results: usize, strict: bool) -> Self {
        Self {
            search,
            fetcher,
            max_results,
            strict,
        }
    }

    async fn try_candidate(&self, candidate: &str) -> Result<Option<String>, PosterError> {
        let html = self.fetcher.fetch(candidate).await?;
        Ok(matchers::find_poster_in_html(&html, STOREFRONT_ORIGIN))
    }
}

#[async_trait]
impl<S: SearchEngine, F: PageFetcher> PosterResolver for StorePosterResolver<S, F> {
    async fn resolve(&self, app_name: &str) -> Option<String> {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return None;
        }

        let query = build_query(app_name);
        let results = match self.search.search(&query, self.max_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!(app = %app_name, "Poster search failed: {e}");
                return None;
            }
        };
        debug!(app = %app_name, results = results.len(), "Poster search returned");

        let candidates = results
            .iter()
            .take(self.max_results)
            .filter(|url| matchers::is_storefront_candidate(url, self.strict));

        for candidate in candidates {
            match self.try_candidate(candidate).await {
                Ok(Some(poster)) => {
                    info!(app = %app_name, candidate = %candidate, "Poster found");
                    return Some(poster);
                }
                Ok(None) => debug!(candidate = %candidate, "No poster markup on candidate"),
                Err(e) => warn!(candidate = %candidate, "Candidate fetch failed: {e}"),
            }
        }

        info!(app = %app_name, "No poster found");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::fetch::MockPageFetcher;
    use super::search::MockSearchEngine;
    use super::*;
    use mockall::predicate::eq;

    const DETAILS: &str = "https://play.google.com/store/apps/details?id=com.chess";

    fn page_with_feature(src: &str) -> String {
        format!(r#"<html><body><img src="/icon.png"><img src="{src}"></body></html>"#)
    }

    fn search_returning(urls: &'static [&'static str]) -> MockSearchEngine {
        let mut search = MockSearchEngine::new();
        search
            .expect_search()
            .returning(move |_, _| Ok(urls.iter().map(ToString::to_string).collect()));
        search
    }

    #[test]
    fn test_build_query_appends_suffix() {
        assert_eq!(
            build_query("  Chess.com "),
            "Chess.com site:play.google.com feature graphic"
        );
    }

    #[tokio::test]
    async fn test_resolves_feature_graphic() {
        let mut search = MockSearchEngine::new();
        search
            .expect_search()
            .with(eq("Chess.com site:play.google.com feature graphic"), eq(3_usize))
            .times(1)
            .returning(|_, _| Ok(vec![DETAILS.to_string()]));

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(DETAILS))
            .times(1)
            .returning(|_| Ok(page_with_feature("https://img.example/a=w1024x500")));

        let resolver = StorePosterResolver::new(search, fetcher, 3, false);
        assert_eq!(
            resolver.resolve("Chess.com").await.as_deref(),
            Some("https://img.example/a=w1024x500")
        );
    }

    #[tokio::test]
    async fn test_relative_source_qualified() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok(page_with_feature("/images/feature.png")));

        let resolver = StorePosterResolver::new(search_returning(&[DETAILS]), fetcher, 3, false);
        assert_eq!(
            resolver.resolve("Chess").await.as_deref(),
            Some("https://play.google.com/images/feature.png")
        );
    }

    #[tokio::test]
    async fn test_search_failure_is_not_found() {
        let mut search = MockSearchEngine::new();
        search
            .expect_search()
            .returning(|_, _| Err(PosterError::Timeout));
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().never();

        let resolver = StorePosterResolver::new(search, fetcher, 3, false);
        assert_eq!(resolver.resolve("Chess").await, None);
    }

    #[tokio::test]
    async fn test_empty_search_is_not_found() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().never();

        let resolver = StorePosterResolver::new(search_returning(&[]), fetcher, 3, false);
        assert_eq!(resolver.resolve("Chess").await, None);
    }

    #[tokio::test]
    async fn test_off_storefront_results_skipped() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch().never();

        let resolver = StorePosterResolver::new(
            search_returning(&["https://www.chess.com/", "https://apps.apple.com/app/chess"]),
            fetcher,
            3,
            false,
        );
        assert_eq!(resolver.resolve("Chess").await, None);
    }

    #[tokio::test]
    async fn test_failed_candidate_falls_through_to_next() {
        const SECOND: &str = "https://play.google.com/store/apps/details?id=com.chess.two";

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(DETAILS))
            .times(1)
            .returning(|_| Err(PosterError::Status(503)));
        fetcher
            .expect_fetch()
            .with(eq(SECOND))
            .times(1)
            .returning(|_| {
                Ok(r#"<meta property="og:image" content="https://img.example/og.png">"#.to_string())
            });

        let resolver =
            StorePosterResolver::new(search_returning(&[DETAILS, SECOND]), fetcher, 3, false);
        assert_eq!(
            resolver.resolve("Chess").await.as_deref(),
            Some("https://img.example/og.png")
        );
    }

    #[tokio::test]
    async fn test_page_without_markup_is_not_found() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_| Ok("<html><img src=\"/icon.png\"></html>".to_string()));

        let resolver = StorePosterResolver::new(search_returning(&[DETAILS]), fetcher, 3, false);
        assert_eq!(resolver.resolve("Chess").await, None);
    }

    #[tokio::test]
    async fn test_result_count_bounded() {
        const EXTRA: &str = "https://play.google.com/store/apps/details?id=com.extra";

        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch()
            .with(eq(DETAILS))
            .times(1)
            .returning(|_| Err(PosterError::Timeout));
        fetcher.expect_fetch().with(eq(EXTRA)).never();

        let resolver =
            StorePosterResolver::new(search_returning(&[DETAILS, EXTRA]), fetcher, 1, false);
        assert_eq!(resolver.resolve("Chess").await, None);
    }

    #[tokio::test]
    async fn test_blank_name_skips_search() {
        let mut search = MockSearchEngine::new();
        search.expect_search().never();
        let resolver = StorePosterResolver::new(search, MockPageFetcher::new(), 3, false);
        assert_eq!(resolver.resolve("   ").await, None);
    }
}
