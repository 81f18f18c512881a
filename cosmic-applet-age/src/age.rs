// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Elapsed time since a selected date, split the way the popup displays it.
///
/// `months` is the calendar month-number gap between the two dates and
/// `hours`/`minutes` are derived from whole days, so the fields are not a
/// positional decomposition of one duration. `seconds` is the only field the
/// refresh cadence rewrites; the rest are fixed per calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBreakdown {
    pub years: i32,
    pub months: u32,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgeError {
    #[error("selected date cannot be in the future")]
    FutureDate,
    #[error("invalid date selection")]
    Selection,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Breaks down the time elapsed between midnight of `selected` and `now`.
///
/// A selection after `now` is rejected rather than clamped. The year count
/// drops by one until the anniversary for the current year has passed.
pub fn compute(selected: NaiveDate, now: NaiveDateTime) -> Result<AgeBreakdown, AgeError> {
    let start = midnight(selected)?;
    if start > now {
        return Err(AgeError::FutureDate);
    }

    let anniversary_pending = (now.month(), now.day()) < (selected.month(), selected.day());
    let years = now.year() - selected.year() - i32::from(anniversary_pending);
    let months = now.month().abs_diff(selected.month());
    let days = now.signed_duration_since(start).num_days();
    let hours = days
        .checked_mul(24)
        .ok_or_else(|| AgeError::Unexpected("hour total overflowed".to_string()))?;
    let minutes = hours
        .checked_mul(60)
        .ok_or_else(|| AgeError::Unexpected("minute total overflowed".to_string()))?;

    Ok(AgeBreakdown {
        years,
        months,
        days,
        hours,
        minutes,
        seconds: 0,
    })
}

/// Whole seconds from midnight of `selected` to `now`, fractional day
/// included. Pure; the refresh cadence calls this once per tick.
pub fn elapsed_seconds(selected: NaiveDate, now: NaiveDateTime) -> Result<i64, AgeError> {
    let start = midnight(selected)?;
    if start > now {
        return Err(AgeError::FutureDate);
    }
    Ok(now.signed_duration_since(start).num_seconds())
}

fn midnight(selected: NaiveDate) -> Result<NaiveDateTime, AgeError> {
    selected.and_hms_opt(0, 0, 0).ok_or(AgeError::Selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn millennium_breakdown() {
        let breakdown = compute(date(2000, 1, 1), at(2024, 6, 15, 12, 0, 0)).unwrap();
        assert_eq!(breakdown.years, 24);
        assert_eq!(breakdown.months, 5);
        assert_eq!(breakdown.days, 8932);
        assert_eq!(breakdown.hours, 8932 * 24);
        assert_eq!(breakdown.minutes, 8932 * 24 * 60);
        assert_eq!(breakdown.seconds, 0);
    }

    #[test]
    fn same_instant_is_all_zero() {
        let breakdown = compute(date(2024, 6, 15), at(2024, 6, 15, 0, 0, 0)).unwrap();
        assert_eq!(
            breakdown,
            AgeBreakdown {
                years: 0,
                months: 0,
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
            }
        );
        assert_eq!(
            elapsed_seconds(date(2024, 6, 15), at(2024, 6, 15, 0, 0, 0)),
            Ok(0)
        );
    }

    #[test]
    fn future_selection_is_rejected() {
        let now = at(2024, 6, 15, 12, 0, 0);
        assert_eq!(compute(date(2024, 6, 16), now), Err(AgeError::FutureDate));
        assert_eq!(
            elapsed_seconds(date(2024, 6, 16), now),
            Err(AgeError::FutureDate)
        );
    }

    #[test]
    fn same_day_selection_is_not_future() {
        // Midnight of today is never after now, even at 00:00:00.
        assert!(compute(date(2024, 6, 15), at(2024, 6, 15, 0, 0, 0)).is_ok());
    }

    #[test]
    fn years_decrement_until_anniversary() {
        let now = at(2024, 6, 15, 12, 0, 0);
        assert_eq!(compute(date(2000, 6, 20), now).unwrap().years, 23);
        assert_eq!(compute(date(2000, 6, 15), now).unwrap().years, 24);
        assert_eq!(compute(date(2000, 6, 10), now).unwrap().years, 24);
    }

    #[test]
    fn months_is_the_calendar_number_gap() {
        // December vs January counts as eleven months apart regardless of the
        // year boundary between them.
        let breakdown = compute(date(2000, 12, 1), at(2024, 1, 5, 0, 0, 0)).unwrap();
        assert_eq!(breakdown.months, 11);
        assert_eq!(breakdown.years, 23);
    }

    #[test]
    fn hours_and_minutes_ignore_the_partial_day() {
        let breakdown = compute(date(2024, 6, 14), at(2024, 6, 15, 23, 59, 59)).unwrap();
        assert_eq!(breakdown.days, 1);
        assert_eq!(breakdown.hours, 24);
        assert_eq!(breakdown.minutes, 1440);
    }

    #[test]
    fn elapsed_seconds_counts_the_partial_day() {
        assert_eq!(
            elapsed_seconds(date(2024, 6, 14), at(2024, 6, 15, 12, 0, 0)),
            Ok(129_600)
        );
    }

    #[test]
    fn elapsed_seconds_is_monotone_in_now() {
        let selected = date(2024, 6, 14);
        let mut previous = i64::MIN;
        for hour in 0..24 {
            let seconds = elapsed_seconds(selected, at(2024, 6, 15, hour, 30, 0)).unwrap();
            assert!(seconds >= previous);
            previous = seconds;
        }
    }

    #[test]
    fn compute_is_idempotent() {
        let selected = date(1995, 3, 9);
        let now = at(2024, 6, 15, 7, 45, 30);
        assert_eq!(compute(selected, now), compute(selected, now));
    }

    #[test]
    fn breakdown_is_non_negative_for_valid_input() {
        let now = at(2024, 6, 15, 12, 0, 0);
        for selected in [date(2024, 6, 15), date(2024, 1, 1), date(1900, 12, 31)] {
            let breakdown = compute(selected, now).unwrap();
            assert!(breakdown.years >= 0);
            assert!(breakdown.days >= 0);
            assert!(breakdown.hours >= 0);
            assert!(breakdown.minutes >= 0);
        }
    }
}
