//! Adherence calculator.
//!
//! Pure dose-accounting arithmetic over [`DoseLog`] rows supplied by the
//! repository. No I/O: every function is a single-call computation over
//! the inputs it is given, so the whole module is trivially unit-testable.

use chrono::NaiveDate;
use thiserror::Error;

use crate::repository::DoseLog;

/// Errors from adherence computations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdherenceError {
    #[error("{0}")]
    InvalidArgument(String),
}

/// Round to two decimal places, half away from zero.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Theoretical dose count implied by the prescription schedule over `days`.
///
/// `days` may be zero (yielding 0) but not negative; `prescribed_per_day`
/// must be strictly positive.
pub fn expected_doses(prescribed_per_day: i64, days: i64) -> Result<i64, AdherenceError> {
    if days < 0 || prescribed_per_day <= 0 {
        return Err(AdherenceError::InvalidArgument(
            "days and prescribed_per_day must be positive".to_string(),
        ));
    }
    prescribed_per_day.checked_mul(days).ok_or_else(|| {
        AdherenceError::InvalidArgument(
            "days and prescribed_per_day are too large".to_string(),
        )
    })
}

/// Percentage of logged doses that were actually taken.
///
/// Operates over the full log set with no date filtering; an empty set
/// yields 0.0.
pub fn adherence_rate(dose_logs: &[DoseLog]) -> f64 {
    if dose_logs.is_empty() {
        return 0.0;
    }
    let taken = dose_logs.iter().filter(|log| log.was_taken).count();
    round2(100.0 * taken as f64 / dose_logs.len() as f64)
}

/// Adherence against the prescription schedule over a calendar-date window.
///
/// Expected doses are `prescribed_per_day` times the inclusive day count
/// between `start` and `end`. A log counts as taken when `was_taken` is set
/// and the calendar date of `taken_at` falls within the window, inclusive
/// on both ends.
pub fn adherence_rate_over_period(
    prescribed_per_day: i64,
    start: NaiveDate,
    end: NaiveDate,
    dose_logs: &[DoseLog],
) -> Result<f64, AdherenceError> {
    if start > end {
        return Err(AdherenceError::InvalidArgument(
            "start_date must be before or equal to end_date".to_string(),
        ));
    }

    let days = (end - start).num_days() + 1;
    let expected = expected_doses(prescribed_per_day, days)?;
    if expected == 0 {
        return Ok(0.0);
    }

    let taken = dose_logs
        .iter()
        .filter(|log| {
            let date = log.taken_at.date_naive();
            log.was_taken && date >= start && date <= end
        })
        .count();

    Ok(round2(100.0 * taken as f64 / expected as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn log(days_ago: i64, was_taken: bool) -> DoseLog {
        DoseLog {
            id: 0,
            medication_id: 1,
            taken_at: Utc.with_ymd_and_hms(2025, 11, 20, 10, 0, 0).unwrap()
                - Duration::days(days_ago),
            was_taken,
        }
    }

    #[test]
    fn expected_doses_multiplies() {
        assert_eq!(expected_doses(2, 7).unwrap(), 14);
        assert_eq!(expected_doses(2, 0).unwrap(), 0);
    }

    #[test]
    fn expected_doses_rejects_negative_days() {
        assert!(expected_doses(2, -1).is_err());
    }

    #[test]
    fn expected_doses_rejects_nonpositive_schedule() {
        assert!(expected_doses(0, 5).is_err());
        assert!(expected_doses(-3, 5).is_err());
    }

    #[test]
    fn expected_doses_rejects_overflowing_product() {
        assert_eq!(
            expected_doses(2, i64::MAX).unwrap_err(),
            AdherenceError::InvalidArgument(
                "days and prescribed_per_day are too large".to_string()
            )
        );
        assert!(expected_doses(i64::MAX, 2).is_err());
        // The largest product that still fits must not be rejected.
        assert_eq!(expected_doses(1, i64::MAX).unwrap(), i64::MAX);
    }

    #[test]
    fn adherence_rate_empty_is_zero() {
        assert_eq!(adherence_rate(&[]), 0.0);
    }

    #[test]
    fn adherence_rate_all_taken_is_100() {
        let logs = vec![log(1, true), log(0, true)];
        assert_eq!(adherence_rate(&logs), 100.0);
    }

    #[test]
    fn adherence_rate_all_missed_is_zero() {
        let logs = vec![log(1, false), log(0, false)];
        assert_eq!(adherence_rate(&logs), 0.0);
    }

    #[test]
    fn adherence_rate_two_of_four_is_50() {
        let logs = vec![log(3, true), log(2, false), log(1, true), log(0, false)];
        assert_eq!(adherence_rate(&logs), 50.0);
    }

    #[test]
    fn over_period_three_day_window_two_of_three() {
        // 1/day over 3 days => 3 expected; 2 taken => 66.67
        let logs = vec![log(2, true), log(1, false), log(0, true)];
        let start = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let rate = adherence_rate_over_period(1, start, end, &logs).unwrap();
        assert_eq!(rate, 66.67);
    }

    #[test]
    fn over_period_start_after_end_is_error() {
        let start = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        let err = adherence_rate_over_period(2, start, end, &[]).unwrap_err();
        assert_eq!(
            err,
            AdherenceError::InvalidArgument(
                "start_date must be before or equal to end_date".to_string()
            )
        );
    }

    #[test]
    fn over_period_single_day_no_logs_is_zero() {
        let day = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let rate = adherence_rate_over_period(1, day, day, &[]).unwrap();
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn over_period_excludes_logs_outside_window() {
        // Log 5 days before the window must not count.
        let logs = vec![log(5, true), log(0, true)];
        let start = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let rate = adherence_rate_over_period(1, start, end, &logs).unwrap();
        assert_eq!(rate, 100.0);
    }

    proptest! {
        #[test]
        fn expected_doses_is_product(per_day in 1i64..1000, days in 0i64..10_000) {
            prop_assert_eq!(expected_doses(per_day, days).unwrap(), per_day * days);
        }

        #[test]
        fn adherence_rate_is_bounded(taken in 0usize..50, missed in 0usize..50) {
            let mut logs = Vec::new();
            for _ in 0..taken {
                logs.push(log(0, true));
            }
            for _ in 0..missed {
                logs.push(log(0, false));
            }
            let rate = adherence_rate(&logs);
            prop_assert!((0.0..=100.0).contains(&rate));
        }
    }
}
