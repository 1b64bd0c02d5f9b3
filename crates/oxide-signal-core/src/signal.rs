//! Randomized signal generation and rendering.
//!
//! Signals are decorative: a direction, odds and a timestamp drawn from
//! simple distributions. The random source is always passed in so callers
//! (and tests) control seeding.

use chrono::{DateTime, Duration, FixedOffset};
use rand::Rng;
use std::fmt;

/// Probability of producing odds from the high band.
const HIGH_ODDS_PROBABILITY: f64 = 0.20;
/// Probability of flipping the previous direction in a chat.
const ALTERNATE_PROBABILITY: f64 = 0.6;

const HIGH_ODDS_BAND: (f64, f64) = (2.20, 2.30);
const NORMAL_ODDS_BAND: (f64, f64) = (1.80, 2.15);

/// Short offsets, weighted towards "right now".
const NEAR_OFFSETS_MINUTES: [i64; 5] = [0, 0, 1, 2, 3];

const DISCLAIMER: &str = "⚠️ Disclaimer: Trade wisely. Market behavior may change.";

/// Trade direction shown in a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

impl Direction {
    /// The other direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Self::Buy
        } else {
            Self::Sell
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
        }
    }
}

/// A generated signal ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    /// Trade direction
    pub direction: Direction,
    /// Odds, rounded to two decimals
    pub odds: f64,
    /// Suggested entry time
    pub at: DateTime<FixedOffset>,
}

impl Signal {
    /// Draw odds and an entry time for `direction`, relative to `now`.
    pub fn generate<R: Rng + ?Sized>(
        direction: Direction,
        now: DateTime<FixedOffset>,
        rng: &mut R,
    ) -> Self {
        Self {
            direction,
            odds: generate_odds(rng),
            at: human_like_time(now, rng),
        }
    }

    /// Render the signal as the chat reply text.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use oxide_signal_core::signal::{Direction, Signal};
    ///
    /// let at = FixedOffset::east_opt(3600)
    ///     .unwrap()
    ///     .with_ymd_and_hms(2026, 10, 18, 9, 7, 0)
    ///     .unwrap();
    /// let signal = Signal { direction: Direction::Buy, odds: 1.9, at };
    /// assert!(signal.render().contains("🎯 Odds: 1.90"));
    /// assert!(signal.render().contains("🕒 Time: 9:07 AM"));
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "📈 Signal Type: {}\n🎯 Odds: {:.2}\n🕒 Time: {}\n{DISCLAIMER}",
            self.direction,
            self.odds,
            format_signal_time(&self.at)
        )
    }
}

/// Pick a direction, preferring to alternate with the chat's last one.
pub fn choose_direction<R: Rng + ?Sized>(last: Option<Direction>, rng: &mut R) -> Direction {
    match last {
        Some(last) if rng.gen_bool(ALTERNATE_PROBABILITY) => last.opposite(),
        _ => Direction::random(rng),
    }
}

/// Draw odds from the normal band, or occasionally the high band.
pub fn generate_odds<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let (low, high) = if rng.gen_bool(HIGH_ODDS_PROBABILITY) {
        HIGH_ODDS_BAND
    } else {
        NORMAL_ODDS_BAND
    };
    round_to_cents(rng.gen_range(low..=high))
}

/// Shift `now` forward by a few minutes so signals look hand-picked.
pub fn human_like_time<R: Rng + ?Sized>(
    now: DateTime<FixedOffset>,
    rng: &mut R,
) -> DateTime<FixedOffset> {
    let roll: f64 = rng.gen();
    let minutes = if roll < 0.6 {
        NEAR_OFFSETS_MINUTES[rng.gen_range(0..NEAR_OFFSETS_MINUTES.len())]
    } else if roll < 0.9 {
        rng.gen_range(4..=10)
    } else {
        rng.gen_range(5..=20)
    };
    now + Duration::minutes(minutes)
}

/// 12-hour clock without a leading zero, e.g. `9:07 AM`.
#[must_use]
pub fn format_signal_time(t: &DateTime<FixedOffset>) -> String {
    t.format("%-I:%M %p").to_string()
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
