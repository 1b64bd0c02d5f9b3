//! Inbound event evaluation
//!
//! Combines keyword matching, the signal window and the rate guard into a
//! single decision per message. Transport-agnostic: the caller maps its own
//! message type into [`Inbound`] and sends whatever [`Reply`] comes back.

use crate::config::{SettingsError, SignalSettings};
use crate::guard::{GuardStats, SignalGuard};
use crate::schedule::{format_hour, SignalWindow};
use crate::signal::Signal;
use crate::trigger::TriggerMatcher;
use chrono::{DateTime, FixedOffset};
use rand::Rng;
use tracing::debug;

/// A chat message as seen by the responder
#[derive(Debug, Clone, Default)]
pub struct Inbound<'a> {
    /// Sender id, `None` for channel posts and anonymous admins
    pub user_id: Option<i64>,
    /// Chat the message was posted in
    pub chat_id: i64,
    /// Message text, if any
    pub text: Option<&'a str>,
    /// Whether the sender is a bot account
    pub from_bot: bool,
}

/// What to send back for an inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send nothing
    Ignore,
    /// Trigger arrived outside the open hours
    OutsideWindow(String),
    /// Sender is still on cooldown
    Cooldown(String),
    /// A fresh signal
    Signal(Signal),
}

impl Reply {
    /// Text to send, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Ignore => None,
            Self::OutsideWindow(text) | Self::Cooldown(text) => Some(text.clone()),
            Self::Signal(signal) => Some(signal.render()),
        }
    }
}

/// Rule evaluator for trigger messages
#[derive(Debug, Clone)]
pub struct SignalResponder {
    matcher: TriggerMatcher,
    window: SignalWindow,
    guard: SignalGuard,
    keyword: String,
    cooldown_secs: u64,
}

impl SignalResponder {
    /// Build a responder from validated settings.
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if the settings fail validation or the
    /// keyword cannot be used.
    pub fn new(settings: &SignalSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        let matcher =
            TriggerMatcher::new(&settings.trigger_keyword).map_err(|_| SettingsError::Invalid {
                key: "trigger_keyword",
                reason: "cannot be compiled into a pattern",
            })?;

        Ok(Self {
            matcher,
            window: SignalWindow::from_settings(settings)?,
            guard: SignalGuard::new(settings),
            keyword: settings.trigger_keyword.trim().to_string(),
            cooldown_secs: settings.user_cooldown_secs,
        })
    }

    /// Current time in the configured local offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.window.now()
    }

    /// Decide how to answer `msg` at `now`.
    ///
    /// A `Reply::Signal` already advanced the chat's direction; call
    /// [`Self::confirm_delivery`] once it has actually been sent.
    pub async fn evaluate<R: Rng + ?Sized>(
        &self,
        msg: &Inbound<'_>,
        now: DateTime<FixedOffset>,
        rng: &mut R,
    ) -> Reply {
        let Some(text) = msg.text else {
            return Reply::Ignore;
        };
        let Some(user_id) = msg.user_id.filter(|_| !msg.from_bot) else {
            return Reply::Ignore;
        };
        if !self.matcher.matches(text) {
            return Reply::Ignore;
        }

        if self.guard.is_chat_throttled(msg.chat_id, now).await {
            debug!("Chat {} is throttled, dropping trigger", msg.chat_id);
            return Reply::Ignore;
        }

        if !self.window.contains(now) {
            return Reply::OutsideWindow(self.outside_window_text());
        }

        if let Some(remaining) = self.guard.cooldown_remaining(user_id, now).await {
            debug!(
                "User {} on cooldown for another {}s",
                user_id,
                remaining.num_seconds()
            );
            return Reply::Cooldown(self.cooldown_text());
        }

        let direction = self.guard.next_direction(msg.chat_id, rng).await;
        Reply::Signal(Signal::generate(direction, now, rng))
    }

    /// Record a signal that was sent successfully.
    pub async fn confirm_delivery(&self, user_id: i64, chat_id: i64, now: DateTime<FixedOffset>) {
        self.guard.record_delivery(user_id, chat_id, now).await;
    }

    /// Guard counters.
    pub async fn stats(&self) -> GuardStats {
        self.guard.stats(self.now()).await
    }

    /// Greeting shown on `/start`.
    #[must_use]
    pub fn welcome_text(&self) -> String {
        format!(
            "🔥 Welcome to BC Crash Live Signals Bot!\n\
             Send a message containing the word `{}` (anywhere) to receive a BC Crash-style signal.\n\
             Signals available between {} and {} ({}). Be responsible — trade wisely.",
            capitalize(&self.keyword),
            format_hour(self.window.open_hour()),
            format_hour(self.window.close_hour()),
            self.zone_label()
        )
    }

    fn outside_window_text(&self) -> String {
        format!(
            "⏳ Signal window closed. Try again between {} and {}.",
            format_hour(self.window.open_hour()),
            format_hour(self.window.close_hour())
        )
    }

    fn cooldown_text(&self) -> String {
        let period = match (self.cooldown_secs / 60, self.cooldown_secs % 60) {
            (1, 0) => "minute".to_string(),
            (n, 0) if n > 0 => format!("{n} minutes"),
            _ => format!("{} seconds", self.cooldown_secs),
        };
        format!(
            "⏳ Please wait before requesting another signal. Signals are limited to one every {period}."
        )
    }

    fn zone_label(&self) -> String {
        let offset = self.window.offset().local_minus_utc();
        if offset == 3600 {
            return "Africa/Lagos".to_string();
        }
        let sign = if offset < 0 { '-' } else { '+' };
        let offset = offset.abs();
        format!("UTC{sign}{:02}:{:02}", offset / 3600, (offset % 3600) / 60)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .expect("valid offset")
            .with_ymd_and_hms(2026, 10, 18, hour, minute, 0)
            .single()
            .expect("unambiguous time")
    }

    fn responder() -> SignalResponder {
        SignalResponder::new(&SignalSettings::default()).expect("default settings are valid")
    }

    fn trigger(user_id: i64, chat_id: i64) -> Inbound<'static> {
        Inbound {
            user_id: Some(user_id),
            chat_id,
            text: Some("Signal please"),
            from_bot: false,
        }
    }

    #[tokio::test]
    async fn test_ignores_non_triggers() {
        let responder = responder();
        let mut rng = StdRng::seed_from_u64(1);
        let now = local(10, 0);

        let plain = Inbound {
            text: Some("hello"),
            ..trigger(1, 1)
        };
        assert_eq!(responder.evaluate(&plain, now, &mut rng).await, Reply::Ignore);

        let no_text = Inbound {
            text: None,
            ..trigger(1, 1)
        };
        assert_eq!(responder.evaluate(&no_text, now, &mut rng).await, Reply::Ignore);

        let bot = Inbound {
            from_bot: true,
            ..trigger(1, 1)
        };
        assert_eq!(responder.evaluate(&bot, now, &mut rng).await, Reply::Ignore);

        let anonymous = Inbound {
            user_id: None,
            ..trigger(1, 1)
        };
        assert_eq!(responder.evaluate(&anonymous, now, &mut rng).await, Reply::Ignore);
    }

    #[tokio::test]
    async fn test_outside_window() {
        let responder = responder();
        let mut rng = StdRng::seed_from_u64(1);

        let reply = responder.evaluate(&trigger(1, 1), local(18, 0), &mut rng).await;
        assert_eq!(
            reply,
            Reply::OutsideWindow(
                "⏳ Signal window closed. Try again between 6AM and 6PM.".to_string()
            )
        );

        let reply = responder.evaluate(&trigger(1, 1), local(5, 59), &mut rng).await;
        assert!(matches!(reply, Reply::OutsideWindow(_)));
    }

    #[tokio::test]
    async fn test_signal_then_cooldown() {
        let responder = responder();
        let mut rng = StdRng::seed_from_u64(1);
        let now = local(10, 0);

        let reply = responder.evaluate(&trigger(1, 1), now, &mut rng).await;
        assert!(matches!(reply, Reply::Signal(_)));
        responder.confirm_delivery(1, 1, now).await;

        let reply = responder
            .evaluate(&trigger(1, 1), now + TimeDelta::minutes(4), &mut rng)
            .await;
        assert_eq!(
            reply,
            Reply::Cooldown(
                "⏳ Please wait before requesting another signal. Signals are limited to one every 5 minutes."
                    .to_string()
            )
        );

        let reply = responder
            .evaluate(&trigger(1, 1), now + TimeDelta::minutes(5), &mut rng)
            .await;
        assert!(matches!(reply, Reply::Signal(_)));
    }

    #[tokio::test]
    async fn test_cooldown_text_keeps_odd_seconds() {
        let settings = SignalSettings {
            user_cooldown_secs: 90,
            ..SignalSettings::default()
        };
        let responder = SignalResponder::new(&settings).expect("valid settings");
        let mut rng = StdRng::seed_from_u64(4);
        let now = local(10, 0);
        responder.confirm_delivery(1, 1, now).await;

        let reply = responder
            .evaluate(&trigger(1, 1), now + TimeDelta::seconds(61), &mut rng)
            .await;
        assert_eq!(
            reply.text().as_deref(),
            Some("⏳ Please wait before requesting another signal. Signals are limited to one every 90 seconds.")
        );

        let one_minute = SignalResponder::new(&SignalSettings {
            user_cooldown_secs: 60,
            ..SignalSettings::default()
        })
        .expect("valid settings");
        assert!(one_minute.cooldown_text().ends_with("one every minute."));
    }

    #[test]
    fn test_new_rejects_unvalidated_settings() {
        let settings = SignalSettings {
            user_cooldown_secs: 100_000_000_000,
            ..SignalSettings::default()
        };
        assert!(matches!(
            SignalResponder::new(&settings),
            Err(SettingsError::Invalid {
                key: "user_cooldown_secs",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_undelivered_signal_does_not_start_cooldown() {
        let responder = responder();
        let mut rng = StdRng::seed_from_u64(2);
        let now = local(10, 0);

        assert!(matches!(
            responder.evaluate(&trigger(1, 1), now, &mut rng).await,
            Reply::Signal(_)
        ));
        assert!(matches!(
            responder.evaluate(&trigger(1, 1), now, &mut rng).await,
            Reply::Signal(_)
        ));
    }

    #[tokio::test]
    async fn test_throttled_chat_is_silent_even_outside_window() {
        let responder = responder();
        let mut rng = StdRng::seed_from_u64(3);
        let now = local(17, 59);

        for user in 0..7 {
            responder.confirm_delivery(user, 1, now).await;
        }

        let reply = responder
            .evaluate(&trigger(99, 1), local(18, 0), &mut rng)
            .await;
        assert_eq!(reply, Reply::Ignore);

        let reply = responder.evaluate(&trigger(99, 2), now, &mut rng).await;
        assert!(matches!(reply, Reply::Signal(_)));
    }

    #[test]
    fn test_welcome_text() {
        let text = responder().welcome_text();
        assert!(text.starts_with("🔥 Welcome to BC Crash Live Signals Bot!"));
        assert!(text.contains("`Signal`"));
        assert!(text.contains("between 6AM and 6PM (Africa/Lagos)"));
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(Reply::Ignore.text(), None);
        assert_eq!(
            Reply::Cooldown("wait".to_string()).text(),
            Some("wait".to_string())
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("signal"), "Signal");
        assert_eq!(capitalize(""), "");
    }
}
