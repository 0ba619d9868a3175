//! Configuration and settings management
//!
//! Loads core settings from config files and environment variables and
//! defines the storefront and retry constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host of the storefront posters are resolved from
pub const STOREFRONT_HOST: &str = "play.google.com";
/// Origin used to qualify relative image sources
pub const STOREFRONT_ORIGIN: &str = "https://play.google.com";
/// Path prefix of a storefront app-detail page
pub const STOREFRONT_DETAILS_PATH: &str = "/store/apps/details";
/// Suffix appended to the app name when searching
pub const SEARCH_QUERY_SUFFIX: &str = "site:play.google.com feature graphic";
/// User-Agent sent with search and page requests
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Default number of search results inspected per lookup
pub const DEFAULT_SEARCH_RESULTS: usize = 3;
/// Upper bound for `poster_search_results`
pub const MAX_SEARCH_RESULTS: usize = 10;
/// Default timeout for a single search or page request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Default lifetime of a cached poster
pub const DEFAULT_POSTER_CACHE_TTL_SECS: u64 = 21_600; // 6 hours
/// Default poster cache capacity
pub const DEFAULT_POSTER_CACHE_MAX_SIZE: u64 = 1_000;

// Telegram API retry configuration
/// Total attempts for a Telegram API call, the first try included
pub const TELEGRAM_API_MAX_ATTEMPTS: usize = 3;
/// Initial backoff between attempts
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

/// Build the layered configuration shared by every crate.
///
/// Sources, lowest priority first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` env vars, plain env vars.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE env vars map to snake_case keys; empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Core settings: the generic-reply link and poster lookup tuning
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoreSettings {
    /// Deep link shown by the generic "open link" reply
    pub link_url: String,

    /// Number of search results inspected per lookup
    #[serde(default = "default_search_results")]
    pub poster_search_results: usize,

    /// Timeout in seconds for a single search or page request
    #[serde(default = "default_http_timeout_secs")]
    pub poster_http_timeout_secs: u64,

    /// Require the app-detail path, not just the storefront host
    #[serde(default)]
    pub poster_strict_match: bool,

    /// Lifetime of a cached poster in seconds
    #[serde(default = "default_poster_cache_ttl_secs")]
    pub poster_cache_ttl_secs: u64,

    /// Maximum number of cached posters
    #[serde(default = "default_poster_cache_max_size")]
    pub poster_cache_max_size: u64,
}

const fn default_search_results() -> usize {
    DEFAULT_SEARCH_RESULTS
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_poster_cache_ttl_secs() -> u64 {
    DEFAULT_POSTER_CACHE_TTL_SECS
}

const fn default_poster_cache_max_size() -> u64 {
    DEFAULT_POSTER_CACHE_MAX_SIZE
}

impl CoreSettings {
    /// Load core settings from config files and environment.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use poster_bot_core::config::CoreSettings;
    ///
    /// let settings = CoreSettings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or `LINK_URL` is missing.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize and validate settings from an already built `Config`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a key is missing, malformed, or `link_url` is not an http(s) URL.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;

        match url::Url::parse(&settings.link_url) {
            Ok(link) if matches!(link.scheme(), "http" | "https") => Ok(settings),
            _ => Err(ConfigError::Message(format!(
                "link_url must be an absolute http(s) URL, got {:?}",
                settings.link_url
            ))),
        }
    }

    /// Search results to inspect, clamped to `1..=MAX_SEARCH_RESULTS`
    #[must_use]
    pub fn search_results(&self) -> usize {
        self.poster_search_results.clamp(1, MAX_SEARCH_RESULTS)
    }

    /// Per-request HTTP timeout
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.poster_http_timeout_secs)
    }

    /// Poster cache entry lifetime
    #[must_use]
    pub const fn poster_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.poster_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        pairs
            .iter()
            .try_fold(Config::builder(), |builder, (key, value)| {
                builder.set_override(*key, *value)
            })?
            .build()
    }

    #[test]
    fn test_defaults_applied() -> Result<(), ConfigError> {
        let settings =
            CoreSettings::from_config(config_with(&[("link_url", "https://example.com/app")])?)?;

        assert_eq!(settings.link_url, "https://example.com/app");
        assert_eq!(settings.search_results(), DEFAULT_SEARCH_RESULTS);
        assert_eq!(settings.http_timeout(), Duration::from_secs(10));
        assert!(!settings.poster_strict_match);
        assert_eq!(settings.poster_cache_max_size, DEFAULT_POSTER_CACHE_MAX_SIZE);
        Ok(())
    }

    #[test]
    fn test_overrides_parsed() -> Result<(), ConfigError> {
        let settings = CoreSettings::from_config(config_with(&[
            ("link_url", "https://example.com"),
            ("poster_search_results", "50"),
            ("poster_http_timeout_secs", "3"),
            ("poster_strict_match", "true"),
        ])?)?;

        // Clamped to the upper bound
        assert_eq!(settings.search_results(), MAX_SEARCH_RESULTS);
        assert_eq!(settings.http_timeout(), Duration::from_secs(3));
        assert!(settings.poster_strict_match);
        Ok(())
    }

    #[test]
    fn test_missing_link_url_fails() -> Result<(), ConfigError> {
        let result = CoreSettings::from_config(config_with(&[("poster_search_results", "2")])?);
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_non_http_link_url_rejected() -> Result<(), ConfigError> {
        let result = CoreSettings::from_config(config_with(&[("link_url", "tg://resolve")])?);
        assert!(result.is_err());
        Ok(())
    }
}
