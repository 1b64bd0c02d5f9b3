//! Telegram transport settings.

use oxide_signal_core::config::{SettingsError, SignalSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Environment variable holding the BotFather token.
pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token (`BOT_TOKEN`).
    #[serde(default)]
    pub bot_token: String,
    /// Comma-separated list of user IDs allowed to run `/stats`.
    #[serde(rename = "admin_users")]
    pub admin_users_str: Option<String>,
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Signal rules shared across handlers.
    pub signal: Arc<SignalSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(signal: SignalSettings, telegram: TelegramSettings) -> Self {
        Self {
            signal: Arc::new(signal),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` if `BOT_TOKEN` is unset or empty, or a load
    /// error if the configuration sources fail.
    pub fn new() -> Result<Self, SettingsError> {
        let settings: Self = oxide_signal_core::config::build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings without a usable token.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` if the token is blank.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.bot_token.trim().is_empty() {
            return Err(SettingsError::MissingToken(BOT_TOKEN_ENV));
        }
        Ok(())
    }

    /// Returns a set of user IDs allowed to see bot statistics.
    #[must_use]
    pub fn admin_users(&self) -> HashSet<i64> {
        self.admin_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}
