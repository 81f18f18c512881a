// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Gets the first date that will be visible on the calendar
pub fn get_calendar_first(year: i32, month: u32, from_weekday: Weekday) -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let num_days = (date.weekday() as u32 + 7 - from_weekday as u32) % 7;
    date.checked_sub_days(Days::new(num_days as u64)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_visible_day_starts_the_week() {
        // May 2025 starts on a Thursday; a Sunday-first grid opens on Apr 27.
        let first = get_calendar_first(2025, 5, Weekday::Sun);
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 4, 27).unwrap());
        assert_eq!(first.weekday(), Weekday::Sun);
    }

    #[test]
    fn month_starting_on_the_week_start_is_not_shifted() {
        // September 2025 starts on a Monday.
        let first = get_calendar_first(2025, 9, Weekday::Mon);
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    }
}
