//! Configuration and settings management
//!
//! Loads the signal rules from configuration files and environment variables.

use chrono::FixedOffset;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default trigger keyword.
pub const DEFAULT_TRIGGER_KEYWORD: &str = "signal";
/// Africa/Lagos is UTC+1 all year.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 60;
/// Window opens at 6:00 local time.
pub const DEFAULT_OPEN_HOUR: u32 = 6;
/// Window closes at 18:00 local time.
pub const DEFAULT_CLOSE_HOUR: u32 = 18;
/// One signal per user every 5 minutes.
pub const DEFAULT_USER_COOLDOWN_SECS: u64 = 300;
/// Sliding window used to count signals per chat.
pub const DEFAULT_CHAT_BURST_WINDOW_SECS: u64 = 30;
/// Signals allowed inside the burst window before the chat is throttled.
pub const DEFAULT_CHAT_BURST_LIMIT: usize = 6;
/// How long a chat stays throttled.
pub const DEFAULT_CHAT_THROTTLE_SECS: u64 = 60;

/// Initial backoff between transport retries.
pub const TRANSPORT_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff between transport retries.
pub const TRANSPORT_MAX_BACKOFF_MS: u64 = 4000;
/// Retries after the first transport attempt (up to 4 sends in total).
pub const TRANSPORT_MAX_RETRIES: usize = 3;

/// Longest accepted cooldown, burst window or throttle: one year.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Underlying configuration source failed
    #[error("Configuration error: {0}")]
    Load(#[from] ConfigError),
    /// Bot access token is not set
    #[error("Environment variable {0} not set. Set it to your BotFather token.")]
    MissingToken(&'static str),
    /// Open hour must be strictly before close hour
    #[error("Invalid signal window: open hour {open} must be before close hour {close} (max 24)")]
    InvalidWindow {
        /// Configured open hour
        open: u32,
        /// Configured close hour
        close: u32,
    },
    /// UTC offset out of range
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
    /// Any other rejected value
    #[error("Invalid setting {key}: {reason}")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}

/// Build the layered configuration shared by all crates.
///
/// Sources, lowest precedence first: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if any source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE maps onto snake_case keys; empty vars count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Signal rules loaded from configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SignalSettings {
    /// Word that triggers a signal reply
    #[serde(default = "default_trigger_keyword")]
    pub trigger_keyword: String,
    /// Local time offset from UTC, in minutes
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// First local hour (inclusive) when signals are served
    #[serde(default = "default_open_hour")]
    pub signal_open_hour: u32,
    /// Local hour (exclusive) when signals stop
    #[serde(default = "default_close_hour")]
    pub signal_close_hour: u32,
    /// Per-user cooldown between delivered signals
    #[serde(default = "default_user_cooldown_secs")]
    pub user_cooldown_secs: u64,
    /// Sliding window for per-chat burst counting
    #[serde(default = "default_chat_burst_window_secs")]
    pub chat_burst_window_secs: u64,
    /// Signals allowed per chat inside the burst window
    #[serde(default = "default_chat_burst_limit")]
    pub chat_burst_limit: usize,
    /// Throttle duration once a chat exceeds the burst limit
    #[serde(default = "default_chat_throttle_secs")]
    pub chat_throttle_secs: u64,
}

fn default_trigger_keyword() -> String {
    DEFAULT_TRIGGER_KEYWORD.to_string()
}

const fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

const fn default_open_hour() -> u32 {
    DEFAULT_OPEN_HOUR
}

const fn default_close_hour() -> u32 {
    DEFAULT_CLOSE_HOUR
}

const fn default_user_cooldown_secs() -> u64 {
    DEFAULT_USER_COOLDOWN_SECS
}

const fn default_chat_burst_window_secs() -> u64 {
    DEFAULT_CHAT_BURST_WINDOW_SECS
}

const fn default_chat_burst_limit() -> usize {
    DEFAULT_CHAT_BURST_LIMIT
}

const fn default_chat_throttle_secs() -> u64 {
    DEFAULT_CHAT_THROTTLE_SECS
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            trigger_keyword: default_trigger_keyword(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            signal_open_hour: DEFAULT_OPEN_HOUR,
            signal_close_hour: DEFAULT_CLOSE_HOUR,
            user_cooldown_secs: DEFAULT_USER_COOLDOWN_SECS,
            chat_burst_window_secs: DEFAULT_CHAT_BURST_WINDOW_SECS,
            chat_burst_limit: DEFAULT_CHAT_BURST_LIMIT,
            chat_throttle_secs: DEFAULT_CHAT_THROTTLE_SECS,
        }
    }
}

impl SignalSettings {
    /// Load and validate settings from all configured sources.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oxide_signal_core::config::SignalSettings;
    ///
    /// let settings = SignalSettings::new().expect("Failed to load configuration");
    /// assert!(settings.signal_open_hour < settings.signal_close_hour);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if loading fails or a value is out of range.
    pub fn new() -> Result<Self, SettingsError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first rejected setting.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let keyword = self.trigger_keyword.trim();
        if keyword.is_empty() {
            return Err(SettingsError::Invalid {
                key: "trigger_keyword",
                reason: "must not be empty",
            });
        }
        let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
        if !keyword.starts_with(is_word_char) || !keyword.ends_with(is_word_char) {
            return Err(SettingsError::Invalid {
                key: "trigger_keyword",
                reason: "must start and end with a letter, digit or underscore",
            });
        }
        if self.signal_open_hour >= self.signal_close_hour || self.signal_close_hour > 24 {
            return Err(SettingsError::InvalidWindow {
                open: self.signal_open_hour,
                close: self.signal_close_hour,
            });
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(SettingsError::InvalidOffset(self.utc_offset_minutes));
        }
        if self.chat_burst_window_secs == 0 {
            return Err(SettingsError::Invalid {
                key: "chat_burst_window_secs",
                reason: "must be positive",
            });
        }
        if self.chat_burst_limit == 0 {
            return Err(SettingsError::Invalid {
                key: "chat_burst_limit",
                reason: "must be positive",
            });
        }
        for (key, secs) in [
            ("user_cooldown_secs", self.user_cooldown_secs),
            ("chat_burst_window_secs", self.chat_burst_window_secs),
            ("chat_throttle_secs", self.chat_throttle_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(SettingsError::Invalid {
                    key,
                    reason: "must not exceed one year",
                });
            }
        }
        Ok(())
    }

    /// Fixed local offset used for the signal window and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOffset` if the offset cannot be represented.
    pub fn utc_offset(&self) -> Result<FixedOffset, SettingsError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .ok_or(SettingsError::InvalidOffset(self.utc_offset_minutes))
    }

    /// Per-user cooldown as a `Duration`.
    #[must_use]
    pub const fn user_cooldown(&self) -> Duration {
        Duration::from_secs(self.user_cooldown_secs)
    }

    /// Burst window as a `Duration`.
    #[must_use]
    pub const fn chat_burst_window(&self) -> Duration {
        Duration::from_secs(self.chat_burst_window_secs)
    }

    /// Throttle duration as a `Duration`.
    #[must_use]
    pub const fn chat_throttle(&self) -> Duration {
        Duration::from_secs(self.chat_throttle_secs)
    }
}
