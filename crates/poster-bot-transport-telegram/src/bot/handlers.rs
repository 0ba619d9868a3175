//! Telegram update handlers
//!
//! Translate updates into [`Inbound`] events, run them through the
//! [`ModeRouter`] and render the returned [`Reply`] values.

use crate::bot::resilient::{
    answer_callback_resilient, edit_message_resilient, send_message_resilient,
    send_photo_resilient,
};
use crate::bot::views::{link_keyboard, mode_keyboard};
use anyhow::Result;
use async_trait::async_trait;
use poster_bot_core::utils::truncate_str;
use poster_bot_core::{Inbound, ModeRouter, Reply};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, CallbackQueryId, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

/// Telegram rejects text messages longer than this
const MAX_MESSAGE_LEN: usize = 4096;

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start the bot and show the mode prompt
    #[command(description = "Start the bot.")]
    Start,
}

/// Is `text` a slash-command (known or not)?
#[must_use]
pub fn is_command_text(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Map callback data to an event. Callbacks without data are dropped.
#[must_use]
pub fn inbound_from_callback(data: Option<&str>) -> Option<Inbound> {
    data.map(|tag| Inbound::SelectMode(tag.to_string()))
}

/// Map message text to an event.
///
/// Messages without text are dropped, and so are slash-commands: `/start`
/// is routed by the command filter and anything else is not ours.
#[must_use]
pub fn inbound_from_text(text: Option<&str>) -> Option<Inbound> {
    text.filter(|t| !is_command_text(t))
        .map(|t| Inbound::Text(t.to_string()))
}

/// Output side of one handled update
#[async_trait]
trait ReplySink: Send + Sync {
    async fn text(&self, text: String) -> Result<()>;
    async fn mode_prompt(&self, text: String) -> Result<()>;
    async fn link_prompt(&self, text: String, url: String) -> Result<()>;
    async fn photo(&self, url: String, caption: String) -> Result<()>;
    /// Acknowledge a mode button; `None` only stops a pending callback spinner
    async fn ack(&self, text: Option<String>) -> Result<()>;
}

struct CallbackTarget {
    query_id: CallbackQueryId,
    message_id: Option<MessageId>,
}

/// Renders replies into a chat, and answers the callback query if there is one
struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
    callback: Option<CallbackTarget>,
}

#[async_trait]
impl ReplySink for TelegramSink {
    async fn text(&self, text: String) -> Result<()> {
        send_message_resilient(&self.bot, self.chat_id, text, None).await?;
        Ok(())
    }

    async fn mode_prompt(&self, text: String) -> Result<()> {
        // Under a callback, re-render the message that carried the buttons
        if let Some(message_id) = self.callback.as_ref().and_then(|c| c.message_id) {
            let edited = edit_message_resilient(
                &self.bot,
                self.chat_id,
                message_id,
                text.clone(),
                Some(mode_keyboard()),
            )
            .await;
            match edited {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Prompt edit failed, sending a new prompt: {e}"),
            }
        }
        send_message_resilient(&self.bot, self.chat_id, text, Some(mode_keyboard())).await?;
        Ok(())
    }

    async fn link_prompt(&self, text: String, url: String) -> Result<()> {
        let keyboard = link_keyboard(&url);
        if keyboard.is_none() {
            warn!(url = %url, "Link URL rejected by Telegram keyboard, sending text only");
        }
        send_message_resilient(&self.bot, self.chat_id, text, keyboard).await?;
        Ok(())
    }

    async fn photo(&self, url: String, caption: String) -> Result<()> {
        if let Err(e) = send_photo_resilient(&self.bot, self.chat_id, &url, &caption).await {
            warn!(url = %url, "Photo send failed, falling back to text: {e}");
            let fallback = truncate_str(format!("{caption}\n{url}"), MAX_MESSAGE_LEN);
            send_message_resilient(&self.bot, self.chat_id, fallback, None).await?;
        }
        Ok(())
    }

    async fn ack(&self, text: Option<String>) -> Result<()> {
        match (&self.callback, text) {
            (Some(callback), text) => {
                answer_callback_resilient(&self.bot, &callback.query_id, text.as_deref()).await
            }
            (None, Some(text)) => self.text(text).await,
            (None, None) => Ok(()),
        }
    }
}

/// Handle the `/start` command.
///
/// # Errors
///
/// Returns an error if sending a reply fails after retries.
pub async fn start(bot: Bot, msg: Message, router: Arc<ModeRouter>) -> Result<()> {
    if msg.from.is_none() {
        debug!("Dropping command without sender");
        return Ok(());
    }
    let user_id = get_user_id_safe(&msg);
    let replies = router.handle(user_id, Inbound::Start).await;
    let sink = TelegramSink {
        bot,
        chat_id: msg.chat.id,
        callback: None,
    };
    deliver_replies(&sink, replies).await
}

/// Handle a plain text message.
///
/// # Errors
///
/// Returns an error if sending a reply fails after retries.
pub async fn handle_text(bot: Bot, msg: Message, router: Arc<ModeRouter>) -> Result<()> {
    if msg.from.is_none() {
        debug!("Dropping message without sender");
        return Ok(());
    }
    let Some(inbound) = inbound_from_text(msg.text()) else {
        debug!("Dropping message without text or with an unknown command");
        return Ok(());
    };

    let user_id = get_user_id_safe(&msg);
    let replies = router.handle(user_id, inbound).await;
    let sink = TelegramSink {
        bot,
        chat_id: msg.chat.id,
        callback: None,
    };
    deliver_replies(&sink, replies).await
}

/// Handle a mode button press.
///
/// # Errors
///
/// Returns an error if answering or replying fails after retries.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, router: Arc<ModeRouter>) -> Result<()> {
    let Some(inbound) = inbound_from_callback(q.data.as_deref()) else {
        debug!("Dropping callback without data");
        return Ok(());
    };
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        // Nowhere to reply; still stop the client-side spinner
        answer_callback_resilient(&bot, &q.id, None).await?;
        return Ok(());
    };

    let user_id = q.from.id.0.cast_signed();
    let replies = router.handle(user_id, inbound).await;
    let sink = TelegramSink {
        bot,
        chat_id,
        callback: Some(CallbackTarget {
            query_id: q.id.clone(),
            message_id: q.message.as_ref().map(|m| m.id()),
        }),
    };
    deliver_replies(&sink, replies).await
}

/// Render replies in order.
///
/// A failed reply is logged and the rest are still sent. Every update ends
/// with exactly one acknowledgment attempt, so a callback query is always
/// answered. Returns the first error, if any.
async fn deliver_replies(sink: &impl ReplySink, replies: Vec<Reply>) -> Result<()> {
    let mut first_error = None;
    let mut acknowledged = false;

    for reply in replies {
        let result = match reply {
            Reply::Text(text) => sink.text(text).await,
            Reply::ModePrompt(text) => sink.mode_prompt(text).await,
            Reply::LinkPrompt { text, url } => sink.link_prompt(text, url).await,
            Reply::Photo { url, caption } => sink.photo(url, caption).await,
            Reply::Ack(text) => {
                acknowledged = true;
                sink.ack(Some(text)).await
            }
        };
        if let Err(e) = result {
            warn!("Reply delivery failed, continuing with the next one: {e}");
            first_error.get_or_insert(e);
        }
    }

    if !acknowledged {
        if let Err(e) = sink.ack(None).await {
            warn!("Callback answer failed: {e}");
            first_error.get_or_insert(e);
        }
    }

    first_error.map_or(Ok(()), Err)
}
