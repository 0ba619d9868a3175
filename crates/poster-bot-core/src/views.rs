//! Reply texts
//!
//! Every user-visible string the mode router produces. Keyboards are the
//! transport's business and live next to it.

use crate::state::Mode;
use crate::utils::truncate_str;

/// App names echoed back in replies are cut to this many characters
pub const MAX_ECHOED_NAME_LEN: usize = 64;

fn echoed_name(app_name: &str) -> String {
    if app_name.chars().count() > MAX_ECHOED_NAME_LEN {
        format!("{}…", truncate_str(app_name, MAX_ECHOED_NAME_LEN))
    } else {
        app_name.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for mode router text rendering
pub trait ModeView {
    /// Greeting for a user seen for the first time
    fn greeting() -> &'static str;

    /// Mode prompt shown right after the greeting
    fn choose_mode() -> &'static str;

    /// Mode prompt for a repeated `/start`
    fn already_started() -> &'static str;

    /// Callback acknowledgment after a mode switch
    fn mode_switched(mode: Mode) -> String;

    /// Mode prompt naming the active mode
    fn current_mode(mode: Mode) -> String;

    /// Callback acknowledgment for a tag that names no mode
    fn unknown_mode() -> &'static str;

    /// Reply to the affection phrase
    fn affection_reply() -> &'static str;

    /// Text above the external link button
    fn link_prompt() -> &'static str;

    /// Caption of a resolved poster
    fn poster_caption(app_name: &str) -> String;

    /// Apology when no poster was found
    fn poster_not_found(app_name: &str) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English implementation of `ModeView`
pub struct DefaultModeView;

impl ModeView for DefaultModeView {
    fn greeting() -> &'static str {
        "👋 Welcome!"
    }

    fn choose_mode() -> &'static str {
        "Choose a mode:"
    }

    fn already_started() -> &'static str {
        "You've already started! Choose a mode:"
    }

    fn mode_switched(mode: Mode) -> String {
        format!("Switched to {} mode!", mode.label())
    }

    fn current_mode(mode: Mode) -> String {
        format!("Current mode: {}. Choose a mode:", mode.label())
    }

    fn unknown_mode() -> &'static str {
        "⚠️ Unknown mode, please use the buttons."
    }

    fn affection_reply() -> &'static str {
        "I love you too ❤️"
    }

    fn link_prompt() -> &'static str {
        "Click the button below:"
    }

    fn poster_caption(app_name: &str) -> String {
        format!("Poster for {}", echoed_name(app_name))
    }

    fn poster_not_found(app_name: &str) -> String {
        format!(
            "Could not find a poster for {}. Try a different app name.",
            echoed_name(app_name)
        )
    }
}

/// Button label for a mode
#[must_use]
pub fn mode_button_label(mode: Mode) -> String {
    format!("{} Mode", mode.label())
}

/// Label of the external link button
pub const LINK_BUTTON_LABEL: &str = "Open Link";
