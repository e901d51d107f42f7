//! Time utilities
//!
//! License dates are UTC; day counts compare calendar dates, not durations.

use chrono::{DateTime, Utc};

/// Current UTC time
pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Signed number of calendar days from `from` to `to`
///
/// Negative when `to` lies before `from`.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_days_between_uses_calendar_dates() {
        let late_evening = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        let next_morning = Utc.with_ymd_and_hms(2026, 3, 2, 0, 1, 0).unwrap();
        assert_eq!(days_between(late_evening, next_morning), 1);
        assert_eq!(days_between(next_morning, late_evening), -1);
        assert_eq!(days_between(late_evening, late_evening), 0);
    }
}
