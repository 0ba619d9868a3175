//! Telegram transport settings.

use config::ConfigError;
use poster_bot_core::config::CoreSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Core settings shared across transport handlers.
    pub core: Arc<CoreSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(core: CoreSettings, telegram: TelegramSettings) -> Self {
        Self {
            core: Arc::new(core),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is empty.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(poster_bot_core::config::build_config()?)
    }

    /// Deserialize and validate settings from an already built config.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the token is missing or blank.
    pub fn from_config(config: config::Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        if settings.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }
}
