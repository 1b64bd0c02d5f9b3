//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! # Usage
//!
//! ```ignore
//! use oxide_signal_transport_telegram::bot::resilient::reply_resilient;
//!
//! let sent = reply_resilient(&bot, &msg, "Hello!").await?;
//! ```

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{Message, ReplyParameters};

/// Reply to `msg` in its chat, retrying on network failures.
///
/// Uses [`oxide_signal_core::utils::retry_transport_operation`] with exponential backoff.
///
/// # Errors
///
/// Returns the last Telegram error once all retries are exhausted.
pub async fn reply_resilient(bot: &Bot, msg: &Message, text: impl Into<String>) -> Result<Message> {
    let text = text.into();
    let chat_id = msg.chat.id;
    let reply_to = msg.id;
    oxide_signal_core::utils::retry_transport_operation(|| async {
        bot.send_message(chat_id, text.clone())
            .reply_parameters(ReplyParameters::new(reply_to))
            .await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}
