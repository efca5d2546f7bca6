//! Wall-clock abstraction.
//!
//! Rotation is keyed on the local calendar date and the rate limiter on
//! milliseconds, so both read time through [`Clock`]. Tests drive a
//! [`ManualClock`] across day boundaries instead of sleeping.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use parking_lot::Mutex;

/// Date format embedded in backup names; zero-padded so that lexicographic
/// order equals chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Local>;

    /// Current local date as `YYYY-MM-DD`.
    fn today(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }

    /// Local date `days` days before now, as `YYYY-MM-DD`.
    fn days_ago(&self, days: i64) -> String {
        (self.now() - chrono::Duration::days(days))
            .format(DATE_FORMAT)
            .to_string()
    }

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

pub type SharedClock = Arc<dyn Clock>;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(SystemClock)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon (local) on the given date. Noon keeps `days_ago` arithmetic away
    /// from DST transitions.
    ///
    /// Returns `None` for an invalid calendar date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let naive = date.and_hms_opt(12, 0, 0)?;
        let now = Local.from_local_datetime(&naive).earliest()?;
        Some(Self::new(now))
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }

    pub fn advance_days(&self, days: i64) {
        *self.now.lock() += chrono::Duration::days(days);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_formats_zero_padded_dates() {
        let clock = ManualClock::at_date(2024, 3, 7).expect("valid date");
        assert_eq!(clock.today(), "2024-03-07");
        assert_eq!(clock.days_ago(7), "2024-02-29");
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at_date(2024, 12, 31).expect("valid date");
        let before = clock.now_millis();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_millis() - before, 250);

        clock.advance_days(1);
        assert_eq!(clock.today(), "2025-01-01");
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(ManualClock::at_date(2023, 2, 29).is_none());
    }
}
