//! Internship tracking: activation, weekly reviews, the manager dashboard and
//! Jira ticket snapshots.

pub mod handlers;
pub mod jira;

use chrono::{DateTime, Duration, Utc};

pub const MIN_REVIEW_SCORE: i16 = 1;
pub const MAX_REVIEW_SCORE: i16 = 5;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Internship week a review made at `now` belongs to: whole days since the
/// start (rounded up) grouped into weeks of seven (rounded up), at least 1.
pub fn week_number(start: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    let elapsed = (now - start).num_milliseconds().abs();
    let days = (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    let week = (days + 6) / 7;
    week.max(1) as i32
}

/// `[start, end)` of an internship week.
pub fn week_bounds(start: DateTime<Utc>, week: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start + Duration::days(7 * i64::from(week.max(1) - 1));
    (from, from + Duration::days(7))
}

/// Completed share of assigned trainings, as a whole percentage.
pub fn training_progress(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (completed.clamp(0, total) * 100 + total / 2) / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_first_day_is_week_one() {
        assert_eq!(week_number(start(), start()), 1);
        assert_eq!(week_number(start(), start() + Duration::hours(3)), 1);
    }

    #[test]
    fn test_week_boundaries() {
        assert_eq!(week_number(start(), start() + Duration::days(7)), 1);
        assert_eq!(week_number(start(), start() + Duration::days(7) + Duration::minutes(1)), 2);
        assert_eq!(week_number(start(), start() + Duration::days(14)), 2);
        assert_eq!(week_number(start(), start() + Duration::days(15)), 3);
    }

    #[test]
    fn test_clock_skew_uses_absolute_difference() {
        assert_eq!(week_number(start(), start() - Duration::days(8)), 2);
    }

    #[test]
    fn test_week_bounds() {
        let (from, to) = week_bounds(start(), 3);
        assert_eq!(from, start() + Duration::days(14));
        assert_eq!(to, start() + Duration::days(21));
    }

    #[test]
    fn test_training_progress() {
        assert_eq!(training_progress(0, 0), 0);
        assert_eq!(training_progress(1, 3), 33);
        assert_eq!(training_progress(2, 3), 67);
        assert_eq!(training_progress(4, 4), 100);
    }
}
