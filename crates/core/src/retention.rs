//! Age-based log retention.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Seconds in one retention day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// How many days of logs to keep. Zero disables pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub days: u32,
}

impl RetentionPolicy {
    pub fn new(days: u32) -> Self {
        Self { days }
    }

    pub fn is_enabled(&self) -> bool {
        self.days > 0
    }

    /// Entries strictly older than the returned instant are eligible for
    /// deletion. `None` when retention is disabled, or when the window
    /// reaches past the earliest representable timestamp, since nothing can
    /// be older than that.
    pub fn cutoff(&self, now: Timestamp) -> Option<Timestamp> {
        if !self.is_enabled() {
            return None;
        }
        let window = TimeDelta::try_seconds(SECONDS_PER_DAY * i64::from(self.days))?;
        now.checked_sub_signed(window)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn zero_days_disables_pruning() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        assert!(!RetentionPolicy::new(0).is_enabled());
        assert_eq!(RetentionPolicy::new(0).cutoff(now), None);
    }

    #[test]
    fn cutoff_is_whole_days_before_now() {
        let now = Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(
            RetentionPolicy::new(30).cutoff(now),
            Some(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn window_beyond_the_calendar_prunes_nothing() {
        let now = Utc.with_ymd_and_hms(2026, 5, 31, 12, 0, 0).unwrap();
        assert_eq!(RetentionPolicy::new(u32::MAX).cutoff(now), None);
        assert!(RetentionPolicy::new(365_000).cutoff(now).is_some());
    }
}
