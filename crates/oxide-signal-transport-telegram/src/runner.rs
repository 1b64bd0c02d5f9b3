use crate::bot;
use crate::bot::handlers::Command;
use crate::config::BotSettings;
use anyhow::{Context, Result};
use oxide_signal_core::responder::SignalResponder;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Run the Telegram transport runtime until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the signal rules cannot be turned into a responder.
pub async fn run_bot(settings: Arc<BotSettings>) -> Result<()> {
    let responder = init_responder(&settings)?;

    let bot = Bot::new(settings.telegram.bot_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, responder])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

fn init_responder(settings: &BotSettings) -> Result<Arc<SignalResponder>> {
    let signal = settings.signal.as_ref();
    let responder =
        SignalResponder::new(signal).context("Failed to initialize signal responder")?;
    info!(
        "Signal rules: keyword '{}', window {}:00-{}:00 (UTC offset {} min), cooldown {}s, burst {} per {}s, throttle {}s",
        signal.trigger_keyword,
        signal.signal_open_hour,
        signal.signal_close_hour,
        signal.utc_offset_minutes,
        signal.user_cooldown_secs,
        signal.chat_burst_limit,
        signal.chat_burst_window_secs,
        signal.chat_throttle_secs
    );
    Ok(Arc::new(responder))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text_message),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    responder: Arc<SignalResponder>,
    settings: Arc<BotSettings>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg, responder).await,
        Command::Help => bot::handlers::help(bot, msg).await,
        Command::Stats => bot::handlers::stats(bot, msg, responder, settings).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text_message(
    bot: Bot,
    msg: Message,
    responder: Arc<SignalResponder>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, responder).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelegramSettings;
    use oxide_signal_core::config::SignalSettings;

    fn settings(signal: SignalSettings) -> BotSettings {
        BotSettings::new(
            signal,
            TelegramSettings {
                bot_token: "123456789:test".to_string(),
                admin_users_str: None,
            },
        )
    }

    #[test]
    fn test_init_responder_accepts_defaults() {
        assert!(init_responder(&settings(SignalSettings::default())).is_ok());
    }

    #[test]
    fn test_init_responder_returns_error_instead_of_exiting() {
        let bad = SignalSettings {
            signal_open_hour: 18,
            signal_close_hour: 6,
            ..SignalSettings::default()
        };
        let err = init_responder(&settings(bad)).expect_err("window is inverted");
        assert!(err.to_string().contains("Failed to initialize signal responder"));
    }
}
