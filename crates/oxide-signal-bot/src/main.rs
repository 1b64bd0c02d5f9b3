use dotenvy::dotenv;
use oxide_signal_core::config::SignalSettings;
use oxide_signal_transport_telegram::config::{BotSettings, TelegramSettings};
use oxide_signal_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt::MakeWriter, prelude::*, EnvFilter};

/// Rewrites Telegram bot tokens out of log text.
///
/// Rules run in order; each pairs a pattern with its replacement template.
struct TokenScrubber {
    rules: Vec<(Regex, &'static str)>,
}

impl TokenScrubber {
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            // https://api.telegram.org/bot<token>/method
            (
                Regex::new(r"(https?://[^/]+/bot)[0-9]+:[A-Za-z0-9_-]+(/['\s]*)")?,
                "${1}[TELEGRAM_TOKEN]${2}",
            ),
            (
                Regex::new(r"[0-9]{8,10}:[A-Za-z0-9_-]{35}")?,
                "[TELEGRAM_TOKEN]",
            ),
            (
                Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
                "${1}[TELEGRAM_TOKEN]",
            ),
        ];
        Ok(Self { rules })
    }

    fn scrub(&self, line: &str) -> String {
        self.rules
            .iter()
            .fold(line.to_string(), |text, (pattern, replacement)| {
                pattern.replace_all(&text, *replacement).into_owned()
            })
    }
}

/// Log sink that scrubs every chunk before passing it on.
struct ScrubbedSink<W> {
    out: W,
    scrubber: Arc<TokenScrubber>,
}

impl<W: Write> Write for ScrubbedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let clean = self.scrubber.scrub(&String::from_utf8_lossy(buf));
        self.out.write_all(clean.as_bytes())?;
        // Callers track progress against their own buffer
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// `MakeWriter` handing out scrubbed stderr sinks.
#[derive(Clone)]
struct ScrubbedStderr(Arc<TokenScrubber>);

impl<'a> MakeWriter<'a> for ScrubbedStderr {
    type Writer = ScrubbedSink<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbedSink {
            out: io::stderr(),
            scrubber: Arc::clone(&self.0),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // Logging must not start before the token scrubber exists
    let scrubber = Arc::new(TokenScrubber::new().map_err(|e| {
        eprintln!("Failed to compile token patterns: {e}");
        e
    })?);

    init_logging(scrubber);

    info!("Starting BC Crash Signals Bot...");

    let settings = init_settings();

    if let Err(e) = run_bot(settings).await {
        error!("Bot stopped: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(scrubber: Arc<TokenScrubber>) {

    let debug_mode = std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    let filter = if debug_mode {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "oxide_signal_bot=info,oxide_signal_core=info,oxide_signal_transport_telegram=info,teloxide=warn,hyper=warn,reqwest=warn,tokio=warn",
            )
        })
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(ScrubbedStderr(scrubber)))
        .init();
}

fn init_settings() -> Arc<BotSettings> {
    let signal_settings = match SignalSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load signal configuration: {}", e);
            std::process::exit(1);
        }
    };
    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(signal_settings, telegram_settings))
}
