//! Utility functions for text truncation and retrying transport calls.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Truncates a string to at most `max_graphemes` user-perceived characters.
///
/// Never splits a multi-byte character or an emoji sequence.
///
/// # Examples
///
/// ```
/// use poster_bot_core::utils::truncate_str;
/// assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_graphemes: usize) -> String {
    s.as_ref().graphemes(true).take(max_graphemes).collect()
}

/// Retry a Telegram API operation with exponential backoff.
///
/// - Initial delay: 500ms
/// - Max delay: 4s
/// - Max attempts: 3 in total, the first try included (see constants in `config.rs`)
///
/// # Errors
///
/// Returns the last error if all attempts fail.
///
/// # Examples
///
/// ```no_run
/// use poster_bot_core::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn send() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { send().await }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_ATTEMPTS, TELEGRAM_API_MAX_BACKOFF_MS,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        // One delay per retry after the first attempt
        .take(TELEGRAM_API_MAX_ATTEMPTS.saturating_sub(1));

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_ATTEMPTS, e
        );
        e
    })
}
