use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use oxide_signal_core::guard::ChatActivity;
use oxide_signal_core::signal::{generate_odds, human_like_time, Direction, Signal};
use oxide_signal_core::trigger::TriggerMatcher;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn base_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3600)
        .expect("valid offset")
        .with_ymd_and_hms(2026, 10, 18, 10, 0, 0)
        .single()
        .expect("unambiguous time")
}

proptest! {
    /// Odds always land in one of the two bands and carry at most two decimals.
    #[test]
    fn odds_stay_in_bands(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let odds = generate_odds(&mut rng);

        let normal = (1.80..=2.15).contains(&odds);
        let high = (2.20..=2.30).contains(&odds);
        prop_assert!(normal || high, "odds {} outside bands", odds);

        let cents = odds * 100.0;
        prop_assert!((cents - cents.round()).abs() < 1e-6);
    }

    /// Entry time is never earlier than now and at most 20 minutes later.
    #[test]
    fn entry_time_is_bounded(seed in any::<u64>(), minute in 0u32..60) {
        let mut rng = StdRng::seed_from_u64(seed);
        let now = base_time() + Duration::minutes(i64::from(minute));
        let at = human_like_time(now, &mut rng);

        prop_assert!(at >= now);
        prop_assert!(at <= now + Duration::minutes(20));
        prop_assert_eq!(at.offset(), now.offset());
    }

    /// Rendered signals always carry all four lines.
    #[test]
    fn render_has_four_lines(seed in any::<u64>(), buy in proptest::bool::ANY) {
        let mut rng = StdRng::seed_from_u64(seed);
        let direction = if buy { Direction::Buy } else { Direction::Sell };
        let rendered = Signal::generate(direction, base_time(), &mut rng).render();

        let lines: Vec<&str> = rendered.lines().collect();
        prop_assert_eq!(lines.len(), 4);
        prop_assert_eq!(lines[0], format!("📈 Signal Type: {direction}"));
        prop_assert!(lines[1].starts_with("🎯 Odds: "));
        prop_assert!(lines[2].starts_with("🕒 Time: "));
    }

    /// The keyword is found regardless of case and surrounding words.
    #[test]
    fn keyword_found_anywhere(
        prefix in "[a-z ]{0,12}",
        suffix in "[a-z ]{0,12}",
        upper in proptest::bool::ANY,
    ) {
        let matcher = TriggerMatcher::new("signal").expect("valid keyword");
        let keyword = if upper { "SIGNAL" } else { "Signal" };
        let text = format!("{prefix} {keyword} {suffix}");
        prop_assert!(matcher.matches(&text));
    }

    /// The throttle trips exactly when the window holds more than the limit.
    #[test]
    fn burst_window_only_keeps_recent(gaps in proptest::collection::vec(0i64..20, 1..50)) {
        let mut activity = ChatActivity::default();
        let window = Duration::seconds(30);
        let mut now = base_time();

        for gap in gaps {
            now += Duration::seconds(gap);
            let tripped = activity.register(now, window, 6, Duration::seconds(60));
            prop_assert!(activity.recent_count() >= 1);
            prop_assert_eq!(tripped, activity.recent_count() > 6);
            if tripped {
                prop_assert!(activity.is_throttled(now));
            }
        }
    }
}
