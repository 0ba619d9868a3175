//! View layer for bot UI components
//!
//! Inline keyboards for the mode prompt and the link reply. Texts come from
//! [`poster_bot_core::views`].

use poster_bot_core::state::ALL_MODES;
use poster_bot_core::views::{mode_button_label, LINK_BUTTON_LABEL};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

/// Keyboard with one callback button per mode, on a single row
///
/// # Examples
///
/// ```
/// use poster_bot_transport_telegram::bot::views::mode_keyboard;
/// let keyboard = mode_keyboard();
/// assert_eq!(keyboard.inline_keyboard[0].len(), 2);
/// ```
#[must_use]
pub fn mode_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![ALL_MODES
        .into_iter()
        .map(|mode| InlineKeyboardButton::callback(mode_button_label(mode), mode.tag()))
        .collect::<Vec<_>>()])
}

/// Keyboard with a single external link button.
///
/// Returns `None` when `url` is not a valid absolute URL.
#[must_use]
pub fn link_keyboard(url: &str) -> Option<InlineKeyboardMarkup> {
    let url = Url::parse(url).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url(LINK_BUTTON_LABEL, url),
    ]]))
}
