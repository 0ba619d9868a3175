//! Poster result cache
//!
//! Remembers resolved posters so repeated lookups of popular apps skip the
//! search and fetch round trips. Misses are never cached: a "not found"
//! may be a transient search or network failure.

use super::PosterResolver;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Caches found posters of an inner resolver, keyed by case-folded app name
pub struct CachedPosterResolver<R> {
    inner: R,
    cache: Cache<String, String>,
}

impl<R: PosterResolver> CachedPosterResolver<R> {
    /// Wrap `inner` with a cache of at most `max_capacity` entries living `ttl`
    #[must_use]
    pub fn new(inner: R, ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    /// Number of cached posters
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn cache_key(app_name: &str) -> String {
    app_name.trim().to_lowercase()
}

#[async_trait]
impl<R: PosterResolver> PosterResolver for CachedPosterResolver<R> {
    async fn resolve(&self, app_name: &str) -> Option<String> {
        let key = cache_key(app_name);
        if let Some(poster) = self.cache.get(&key).await {
            debug!(app = %app_name, "Poster cache hit");
            return Some(poster);
        }

        let poster = self.inner.resolve(app_name).await?;
        self.cache.insert(key, poster.clone()).await;
        Some(poster)
    }
}

#[cfg(test)]
mod tests {
    use super::super::MockPosterResolver;
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_found_poster_cached() {
        let mut inner = MockPosterResolver::new();
        inner
            .expect_resolve()
            .times(1)
            .returning(|_| Some("https://img.example/p.png".to_string()));

        let resolver = CachedPosterResolver::new(inner, HOUR, 10);
        assert_eq!(
            resolver.resolve("Chess.com").await.as_deref(),
            Some("https://img.example/p.png")
        );
        // Same app, different case and padding: served from cache
        assert_eq!(
            resolver.resolve("  chess.COM ").await.as_deref(),
            Some("https://img.example/p.png")
        );

        resolver.cache.run_pending_tasks().await;
        assert_eq!(resolver.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_miss_not_cached() {
        let mut inner = MockPosterResolver::new();
        inner.expect_resolve().times(2).returning(|_| None);

        let resolver = CachedPosterResolver::new(inner, HOUR, 10);
        assert_eq!(resolver.resolve("Nope").await, None);
        assert_eq!(resolver.resolve("Nope").await, None);
    }
}
