//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Every wrapper retries transient failures using exponential backoff with
//! jitter (see [`poster_bot_core::utils::retry_telegram_operation`]).

use anyhow::Result;
use poster_bot_core::utils::{retry_telegram_operation, truncate_str};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, InputFile, Message, MessageId};
use tracing::debug;
use url::Url;

/// Telegram caps photo captions at 1024 characters
const MAX_CAPTION_LEN: usize = 1024;

/// Send a text message, optionally with an inline keyboard.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Message> {
    let text = text.into();
    retry_telegram_operation(|| async {
        let mut req = bot.send_message(chat_id, text.clone());
        if let Some(markup) = keyboard.clone() {
            req = req.reply_markup(markup);
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Send a photo by URL with a caption.
///
/// # Errors
///
/// Returns an error if `url` is not a valid URL or after all retries are
/// exhausted (e.g. Telegram could not fetch the image).
pub async fn send_photo_resilient(
    bot: &Bot,
    chat_id: ChatId,
    url: &str,
    caption: &str,
) -> Result<Message> {
    let url = Url::parse(url)?;
    let caption = truncate_str(caption, MAX_CAPTION_LEN);
    retry_telegram_operation(|| async {
        bot.send_photo(chat_id, InputFile::url(url.clone()))
            .caption(caption.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram photo error: {e}"))
    })
    .await
}

/// Edit a message's text and keyboard.
///
/// Returns `Ok(None)` when Telegram reports the message as not modified.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Option<Message>> {
    let text = text.into();
    retry_telegram_operation(|| async {
        let mut req = bot.edit_message_text(chat_id, msg_id, text.clone());
        if let Some(markup) = keyboard.clone() {
            req = req.reply_markup(markup);
        }
        match req.await {
            Ok(msg) => Ok(Some(msg)),
            Err(e) => {
                if e.to_string().contains("message is not modified") {
                    debug!("Message update skipped: message is not modified");
                    return Ok(None);
                }
                Err(anyhow::anyhow!("Telegram edit error: {e}"))
            }
        }
    })
    .await
}

/// Answer a callback query, showing `text` as a toast when given.
///
/// # Errors
///
/// Returns an error after all retries are exhausted.
pub async fn answer_callback_resilient(
    bot: &Bot,
    query_id: &teloxide::types::CallbackQueryId,
    text: Option<&str>,
) -> Result<()> {
    retry_telegram_operation(|| async {
        let mut req = bot.answer_callback_query(query_id.clone());
        if let Some(text) = text {
            req = req.text(text.to_string());
        }
        req.await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram callback answer error: {e}"))
    })
    .await
}
