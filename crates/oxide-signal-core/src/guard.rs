//! Per-user cooldown and per-chat burst protection
//!
//! Users get one signal per cooldown period. Chats that receive too many
//! signals inside a short sliding window are throttled: further triggers in
//! that chat are dropped silently until the throttle expires. All state is
//! in memory and pruned by elapsed time.

use crate::config::{SignalSettings, MAX_DURATION_SECS};
use crate::signal::{choose_direction, Direction};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use moka::future::Cache;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Chats idle longer than this are forgotten (including their last direction).
const CHAT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound on tracked users and chats.
const MAX_TRACKED_ENTRIES: u64 = 100_000;

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// `t + d`, pinned to the latest representable instant on overflow.
fn saturating_add(t: DateTime<FixedOffset>, d: TimeDelta) -> DateTime<FixedOffset> {
    t.checked_add_signed(d)
        .unwrap_or_else(|| DateTime::<Utc>::MAX_UTC.fixed_offset())
}

/// Recent signal activity of one chat
#[derive(Debug, Default, Clone)]
pub struct ChatActivity {
    recent: VecDeque<DateTime<FixedOffset>>,
    throttled_until: Option<DateTime<FixedOffset>>,
    last_direction: Option<Direction>,
}

impl ChatActivity {
    /// Returns true while the throttle is active.
    #[must_use]
    pub fn is_throttled(&self, now: DateTime<FixedOffset>) -> bool {
        self.throttled_until.is_some_and(|until| until > now)
    }

    /// Record a signal at `now`, pruning timestamps that left the window.
    ///
    /// Returns true if this signal tripped the throttle.
    pub fn register(
        &mut self,
        now: DateTime<FixedOffset>,
        window: TimeDelta,
        limit: usize,
        throttle: TimeDelta,
    ) -> bool {
        self.recent.push_back(now);
        // No representable cutoff means every timestamp is still inside the window
        if let Some(cutoff) = now.checked_sub_signed(window) {
            self.recent.retain(|ts| *ts > cutoff);
        }

        if self.recent.len() > limit {
            self.throttled_until = Some(saturating_add(now, throttle));
            return true;
        }
        false
    }

    /// Timestamps still inside the burst window.
    #[must_use]
    pub fn recent_count(&self) -> usize {
        self.recent.len()
    }

    /// End of the current or most recent throttle.
    #[must_use]
    pub const fn throttled_until(&self) -> Option<DateTime<FixedOffset>> {
        self.throttled_until
    }

    /// Direction of the last signal issued in this chat.
    #[must_use]
    pub const fn last_direction(&self) -> Option<Direction> {
        self.last_direction
    }
}

/// Snapshot of guard state for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuardStats {
    /// Users currently remembered for cooldown
    pub tracked_users: u64,
    /// Chats with remembered activity
    pub tracked_chats: u64,
    /// Chats whose throttle is active right now
    pub throttled_chats: u64,
    /// Signals delivered since start
    pub delivered: u64,
}

/// In-memory rate guard shared across handlers
#[derive(Debug, Clone)]
pub struct SignalGuard {
    /// user_id -> time of the last delivered signal; TTL equals the cooldown
    last_signal_by_user: Cache<i64, DateTime<FixedOffset>>,
    /// chat_id -> recent activity
    chats: Cache<i64, Arc<Mutex<ChatActivity>>>,
    cooldown: TimeDelta,
    burst_window: TimeDelta,
    burst_limit: usize,
    throttle: TimeDelta,
    delivered: Arc<AtomicU64>,
}

impl SignalGuard {
    /// Create a guard using the cooldown and burst settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxide_signal_core::config::SignalSettings;
    /// use oxide_signal_core::guard::SignalGuard;
    ///
    /// let guard = SignalGuard::new(&SignalSettings::default());
    /// assert_eq!(guard.cooldown().num_minutes(), 5);
    /// ```
    #[must_use]
    pub fn new(settings: &SignalSettings) -> Self {
        let cooldown = settings.user_cooldown();
        let last_signal_by_user = Cache::builder()
            .max_capacity(MAX_TRACKED_ENTRIES)
            .time_to_live(cooldown.clamp(
                Duration::from_secs(1),
                Duration::from_secs(MAX_DURATION_SECS),
            ))
            .build();
        let chats = Cache::builder()
            .max_capacity(MAX_TRACKED_ENTRIES)
            .time_to_idle(CHAT_IDLE_TTL)
            .build();

        Self {
            last_signal_by_user,
            chats,
            cooldown: to_delta(cooldown),
            burst_window: to_delta(settings.chat_burst_window()),
            burst_limit: settings.chat_burst_limit,
            throttle: to_delta(settings.chat_throttle()),
            delivered: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns true if signals in `chat_id` are currently suppressed.
    pub async fn is_chat_throttled(&self, chat_id: i64, now: DateTime<FixedOffset>) -> bool {
        match self.chats.get(&chat_id).await {
            Some(activity) => activity.lock().await.is_throttled(now),
            None => false,
        }
    }

    /// Time left before `user_id` may receive another signal, if any.
    pub async fn cooldown_remaining(
        &self,
        user_id: i64,
        now: DateTime<FixedOffset>,
    ) -> Option<TimeDelta> {
        let last = self.last_signal_by_user.get(&user_id).await?;
        let until = saturating_add(last, self.cooldown);
        (now < until).then(|| until - now)
    }

    /// Choose the next direction for `chat_id` and remember it.
    pub async fn next_direction<R: Rng + ?Sized>(&self, chat_id: i64, rng: &mut R) -> Direction {
        let activity = self.chat_activity(chat_id).await;
        let mut activity = activity.lock().await;
        let direction = choose_direction(activity.last_direction, rng);
        activity.last_direction = Some(direction);
        direction
    }

    /// Record a delivered signal for cooldown and burst accounting.
    pub async fn record_delivery(&self, user_id: i64, chat_id: i64, now: DateTime<FixedOffset>) {
        self.last_signal_by_user.insert(user_id, now).await;
        self.delivered.fetch_add(1, Ordering::Relaxed);

        let activity = self.chat_activity(chat_id).await;
        let mut activity = activity.lock().await;
        let tripped = activity.register(now, self.burst_window, self.burst_limit, self.throttle);
        if tripped {
            info!(
                "Chat {} exceeded {} signals in {}s, throttled for {}s",
                chat_id,
                self.burst_limit,
                self.burst_window.num_seconds(),
                self.throttle.num_seconds()
            );
        } else {
            debug!(
                "Chat {} has {} recent signals",
                chat_id,
                activity.recent_count()
            );
        }
    }

    /// Current state counters.
    pub async fn stats(&self, now: DateTime<FixedOffset>) -> GuardStats {
        self.last_signal_by_user.run_pending_tasks().await;
        self.chats.run_pending_tasks().await;

        let activities: Vec<_> = self.chats.iter().map(|(_, activity)| activity).collect();
        let mut throttled_chats = 0;
        for activity in activities {
            if activity.lock().await.is_throttled(now) {
                throttled_chats += 1;
            }
        }

        GuardStats {
            tracked_users: self.last_signal_by_user.entry_count(),
            tracked_chats: self.chats.entry_count(),
            throttled_chats,
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }

    /// Configured per-user cooldown.
    #[must_use]
    pub const fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    async fn chat_activity(&self, chat_id: i64) -> Arc<Mutex<ChatActivity>> {
        self.chats
            .get_with(chat_id, async { Arc::new(Mutex::new(ChatActivity::default())) })
            .await
    }
}
