use crate::bot::resilient::reply_resilient;
use crate::config::BotSettings;
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use oxide_signal_core::guard::GuardStats;
use oxide_signal_core::responder::{Inbound, Reply, SignalResponder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, info};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    if let Some(ref user) = msg.from {
        if let Some(ref username) = user.username {
            return username.clone();
        }
        if !user.first_name.is_empty() {
            return user.first_name.clone();
        }
    }
    "Unknown".to_string()
}

/// Safe extraction of user ID from a message.
/// Returns `None` for channel posts and anonymous senders.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|u| u.id.0.cast_signed())
}

/// Map a Telegram message onto the transport-agnostic event.
#[must_use]
pub fn to_inbound(msg: &Message) -> Inbound<'_> {
    Inbound {
        user_id: get_user_id_safe(msg),
        chat_id: msg.chat.id.0,
        text: msg.text(),
        from_bot: msg.from.as_ref().is_some_and(|u| u.is_bot),
    }
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// List commands
    #[command(description = "Show this help.")]
    Help,
    /// Show guard statistics (admins only)
    #[command(description = "Show bot statistics.")]
    Stats,
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message, responder: Arc<SignalResponder>) -> Result<()> {
    let user_name = get_user_name(&msg);
    info!(
        "User {:?} ({user_name}) initiated /start command in chat {}.",
        get_user_id_safe(&msg),
        msg.chat.id.0
    );

    reply_resilient(&bot, &msg, responder.welcome_text()).await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    reply_resilient(&bot, &msg, Command::descriptions().to_string()).await?;
    Ok(())
}

/// Stats handler, answered only for configured admins
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn stats(
    bot: Bot,
    msg: Message,
    responder: Arc<SignalResponder>,
    settings: Arc<BotSettings>,
) -> Result<()> {
    let is_admin = get_user_id_safe(&msg)
        .is_some_and(|id| settings.telegram.admin_users().contains(&id));
    if !is_admin {
        debug!(
            "Ignoring /stats from non-admin {:?} in chat {}",
            get_user_id_safe(&msg),
            msg.chat.id.0
        );
        return Ok(());
    }

    let stats = responder.stats().await;
    reply_resilient(&bot, &msg, format_stats(&stats)).await?;
    Ok(())
}

/// Render guard statistics for `/stats`.
#[must_use]
pub fn format_stats(stats: &GuardStats) -> String {
    format!(
        "📊 Signal bot stats\n\
         Signals delivered: {}\n\
         Users on cooldown: {}\n\
         Active chats: {}\n\
         Throttled chats: {}",
        stats.delivered, stats.tracked_users, stats.tracked_chats, stats.throttled_chats
    )
}

/// Send a signal and count it against the rate guard once the send succeeded.
///
/// A failed send leaves cooldown and burst state untouched, so the user can
/// retry immediately.
///
/// # Errors
///
/// Returns the send error unchanged.
pub async fn deliver_signal<F, Fut, T>(
    responder: &SignalResponder,
    inbound: &Inbound<'_>,
    now: DateTime<FixedOffset>,
    send: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let sent = send().await?;
    if let Some(user_id) = inbound.user_id {
        responder
            .confirm_delivery(user_id, inbound.chat_id, now)
            .await;
    }
    Ok(sent)
}

/// Text message handler: evaluates trigger rules and replies.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent after retries.
pub async fn handle_text(bot: Bot, msg: Message, responder: Arc<SignalResponder>) -> Result<()> {
    let inbound = to_inbound(&msg);
    let now = responder.now();
    let mut rng = StdRng::from_entropy();

    let reply = responder.evaluate(&inbound, now, &mut rng).await;
    let Some(text) = reply.text() else {
        return Ok(());
    };

    match reply {
        Reply::Signal(signal) => {
            deliver_signal(&responder, &inbound, now, || {
                reply_resilient(&bot, &msg, text)
            })
            .await?;
            info!(
                "Signal {} @ {:.2} sent to user {} ({}) in chat {}",
                signal.direction,
                signal.odds,
                inbound.user_id.unwrap_or_default(),
                get_user_name(&msg),
                inbound.chat_id
            );
        }
        Reply::OutsideWindow(_) | Reply::Cooldown(_) => {
            debug!(
                "Refused signal for user {:?} in chat {}",
                inbound.user_id, inbound.chat_id
            );
            reply_resilient(&bot, &msg, text).await?;
        }
        Reply::Ignore => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_signal_core::config::SignalSettings;

    fn responder() -> SignalResponder {
        SignalResponder::new(&SignalSettings::default()).expect("default settings are valid")
    }

    fn trigger() -> Inbound<'static> {
        Inbound {
            user_id: Some(7),
            chat_id: -100,
            text: Some("signal"),
            from_bot: false,
        }
    }

    #[tokio::test]
    async fn test_failed_send_is_not_counted() {
        let responder = responder();
        let now = responder.now();

        let res = deliver_signal(&responder, &trigger(), now, || async {
            Err::<(), _>(anyhow::anyhow!("network down"))
        })
        .await;
        assert!(res.is_err());

        let stats = responder.stats().await;
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.tracked_users, 0);
    }

    #[tokio::test]
    async fn test_successful_send_starts_cooldown() {
        let responder = responder();
        let now = responder.now();

        let sent = deliver_signal(&responder, &trigger(), now, || async { Ok(42) })
            .await
            .expect("send succeeds");
        assert_eq!(sent, 42);

        let stats = responder.stats().await;
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.tracked_users, 1);
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start", "signal_bot").ok(), Some(Command::Start));
        assert_eq!(Command::parse("/help", "signal_bot").ok(), Some(Command::Help));
        assert_eq!(
            Command::parse("/stats@signal_bot", "signal_bot").ok(),
            Some(Command::Stats)
        );
        assert!(Command::parse("/signal", "signal_bot").is_err());
    }

    #[test]
    fn test_descriptions_list_commands() {
        let help = Command::descriptions().to_string();
        assert!(help.contains("/start"));
        assert!(help.contains("/stats"));
    }

    #[test]
    fn test_format_stats() {
        let text = format_stats(&GuardStats {
            tracked_users: 3,
            tracked_chats: 2,
            throttled_chats: 1,
            delivered: 10,
        });
        assert!(text.contains("Signals delivered: 10"));
        assert!(text.contains("Users on cooldown: 3"));
        assert!(text.contains("Throttled chats: 1"));
    }
}
