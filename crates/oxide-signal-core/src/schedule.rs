//! Trading-hours window in a fixed local offset.

use crate::config::{SettingsError, SignalSettings};
use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};

/// Local hours during which signals are served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalWindow {
    offset: FixedOffset,
    open_hour: u32,
    close_hour: u32,
}

impl SignalWindow {
    /// Create a window `[open_hour, close_hour)` in `offset`.
    #[must_use]
    pub const fn new(offset: FixedOffset, open_hour: u32, close_hour: u32) -> Self {
        Self {
            offset,
            open_hour,
            close_hour,
        }
    }

    /// Build the window from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOffset` if the configured offset is not representable.
    pub fn from_settings(settings: &SignalSettings) -> Result<Self, SettingsError> {
        Ok(Self::new(
            settings.utc_offset()?,
            settings.signal_open_hour,
            settings.signal_close_hour,
        ))
    }

    /// Current wall-clock time in the window's offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.localize(Utc::now())
    }

    /// Convert any instant into the window's offset.
    #[must_use]
    pub fn localize<Tz: TimeZone>(&self, t: DateTime<Tz>) -> DateTime<FixedOffset> {
        t.with_timezone(&self.offset)
    }

    /// Returns true if `t` falls inside the open hours.
    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, t: DateTime<Tz>) -> bool {
        let hour = self.localize(t).hour();
        self.open_hour <= hour && hour < self.close_hour
    }

    /// Local offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Opening hour.
    #[must_use]
    pub const fn open_hour(&self) -> u32 {
        self.open_hour
    }

    /// Closing hour.
    #[must_use]
    pub const fn close_hour(&self) -> u32 {
        self.close_hour
    }
}

/// Render an hour of the day as `6AM`, `12PM`, `6PM`, `12AM`.
#[must_use]
pub fn format_hour(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    let twelve = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{twelve}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn lagos() -> FixedOffset {
        FixedOffset::east_opt(3600).expect("valid offset")
    }

    fn at_utc(hour: u32, minute: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid test time")
            .and_utc()
    }

    #[test]
    fn test_window_bounds_in_local_time() {
        let window = SignalWindow::new(lagos(), 6, 18);

        // 05:00 UTC is 06:00 in Lagos
        assert!(window.contains(at_utc(5, 0)));
        assert!(!window.contains(at_utc(4, 59)));
        // 16:59 UTC is 17:59 local, 17:00 UTC is 18:00 local
        assert!(window.contains(at_utc(16, 59)));
        assert!(!window.contains(at_utc(17, 0)));
    }

    #[test]
    fn test_localize_shifts_hour() {
        let window = SignalWindow::new(lagos(), 6, 18);
        assert_eq!(window.localize(at_utc(23, 30)).hour(), 0);
    }

    #[test]
    fn test_from_default_settings() -> Result<(), SettingsError> {
        let window = SignalWindow::from_settings(&SignalSettings::default())?;
        assert_eq!(window.open_hour(), 6);
        assert_eq!(window.close_hour(), 18);
        Ok(())
    }

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour(6), "6AM");
        assert_eq!(format_hour(18), "6PM");
        assert_eq!(format_hour(12), "12PM");
        assert_eq!(format_hour(0), "12AM");
        assert_eq!(format_hour(24), "12AM");
    }
}
