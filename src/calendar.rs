/*
 *  calendar.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Month grid: leading/trailing days, holiday and today annotation
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use chrono::{Datelike, NaiveDate};

use crate::datefmt::to_date_key;
use crate::holiday::{is_holiday, HolidayRecord};

pub const DAYS_PER_WEEK: usize = 7;

/// One square of the month grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub holiday: Option<&'a HolidayRecord>,
    pub is_today: bool,
    pub is_current_month: bool,
}

/// Year/month pair the calendar panel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    pub year: i32,
    pub month: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date<D: Datelike>(d: &D) -> Self {
        Self { year: d.year(), month: d.month() }
    }

    pub fn prev(self) -> Self {
        if self.month <= 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Number of days in `month` (1-12) of `year`, 0 for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let cur = MonthCursor::new(year, month);
    match (cur.first_day(), cur.next().first_day()) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days() as u32,
        _ => 0,
    }
}

/// Weekday of the 1st, 0 = Sunday.
pub fn first_weekday(year: i32, month: u32) -> Option<u32> {
    MonthCursor::new(year, month)
        .first_day()
        .map(|d| d.weekday().num_days_from_sunday())
}

/// Builds the grid for `year`/`month` as rows of seven cells.
///
/// The first row is padded with the tail of the previous month and the last
/// row with the head of the next one; both kinds of padding carry
/// `is_current_month = false` but are still annotated with holidays.
/// `today` only marks a cell when its exact date is in the grid.
pub fn build_month_grid<'a>(
    year: i32,
    month: u32,
    records: &'a [HolidayRecord],
    today: NaiveDate,
) -> Vec<Vec<DayCell<'a>>> {
    let cur = MonthCursor::new(year, month);
    let (Some(first), Some(lead)) = (cur.first_day(), first_weekday(year, month)) else {
        return Vec::new();
    };
    let body = days_in_month(year, month) as usize;
    let lead = lead as usize;
    let total = (lead + body).div_ceil(DAYS_PER_WEEK) * DAYS_PER_WEEK;

    // Walking day by day from the first leading cell handles both the
    // January and December rollovers without special cases.
    let Some(start) = first.checked_sub_days(chrono::Days::new(lead as u64)) else {
        return Vec::new();
    };

    let cells: Vec<DayCell<'a>> = start
        .iter_days()
        .take(total)
        .map(|date| {
            let is_current_month = date.year() == year && date.month() == month;
            DayCell {
                date,
                holiday: is_holiday(&to_date_key(&date), records),
                is_today: is_current_month && date == today,
                is_current_month,
            }
        })
        .collect();

    cells
        .chunks(DAYS_PER_WEEK)
        .map(|week| week.to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 1), 31);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 0), 0);
        assert_eq!(days_in_month(2025, 13), 0);
    }

    #[test]
    fn test_first_weekday() {
        assert_eq!(first_weekday(2025, 6), Some(0)); // Sunday
        assert_eq!(first_weekday(2025, 12), Some(1)); // Monday
        assert_eq!(first_weekday(2026, 8), Some(6)); // Saturday
        assert_eq!(first_weekday(2026, 13), None);
    }

    #[test]
    fn test_grid_shape_for_every_month() {
        let today = ymd(2025, 3, 31);
        for year in [1999, 2000, 2024, 2025, 2026] {
            for month in 1..=12 {
                let grid = build_month_grid(year, month, &[], today);
                let dim = days_in_month(year, month) as usize;
                assert!(grid.iter().all(|row| row.len() == DAYS_PER_WEEK));
                let total: usize = grid.iter().map(Vec::len).sum();
                assert_eq!(total % DAYS_PER_WEEK, 0);
                assert!(total >= dim);
                assert!(total < dim + 2 * DAYS_PER_WEEK);

                let in_month: Vec<&DayCell> = grid.iter().flatten().filter(|c| c.is_current_month).collect();
                assert_eq!(in_month.len(), dim, "{}-{}", year, month);
                assert!(in_month.iter().all(|c| c.date.month() == month && c.date.year() == year));

                // consecutive days, first cell on a Sunday
                let flat: Vec<NaiveDate> = grid.iter().flatten().map(|c| c.date).collect();
                assert_eq!(flat[0].weekday().num_days_from_sunday(), 0);
                assert!(flat.windows(2).all(|w| w[0].succ_opt() == Some(w[1])));
            }
        }
    }

    #[test]
    fn test_sunday_start_has_no_leading_cells() {
        // June 2025 starts on a Sunday
        let grid = build_month_grid(2025, 6, &[], ymd(2025, 6, 1));
        assert_eq!(grid[0][0].date, ymd(2025, 6, 1));
        assert!(grid[0][0].is_current_month);
        assert!(grid[0][0].is_today);
    }

    #[test]
    fn test_december_rolls_both_ways() {
        let grid = build_month_grid(2025, 12, &[], ymd(2025, 12, 15));
        // 1 Dec 2025 is a Monday: one leading day, Sunday 30 Nov
        let first = &grid[0][0];
        assert_eq!(first.date, ymd(2025, 11, 30));
        assert!(!first.is_current_month);
        assert_eq!(grid[0][1].date, ymd(2025, 12, 1));

        let last_row = grid.last().unwrap();
        let last = last_row.last().unwrap();
        assert_eq!(last.date, ymd(2026, 1, 3));
        assert!(!last.is_current_month);
        assert_eq!(grid.iter().flatten().filter(|c| c.date.year() == 2026).count(), 3);
    }

    #[test]
    fn test_january_rolls_into_previous_year() {
        // 1 Jan 2026 is a Thursday: leading 28-31 Dec 2025
        let grid = build_month_grid(2026, 1, &[], ymd(2026, 1, 1));
        let lead: Vec<NaiveDate> = grid[0].iter().take_while(|c| !c.is_current_month).map(|c| c.date).collect();
        assert_eq!(lead, [ymd(2025, 12, 28), ymd(2025, 12, 29), ymd(2025, 12, 30), ymd(2025, 12, 31)]);
    }

    #[test]
    fn test_today_only_in_matching_month() {
        let today = ymd(2025, 3, 31);
        let march = build_month_grid(2025, 3, &[], today);
        let marked: Vec<&DayCell> = march.iter().flatten().filter(|c| c.is_today).collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].date, today);

        // 31 Mar shows as a leading cell of April's grid, but April has no today
        let april = build_month_grid(2025, 4, &[], today);
        assert!(april.iter().flatten().any(|c| c.date == today && !c.is_current_month));
        assert!(april.iter().flatten().all(|c| !c.is_today));

        // 1 Apr trails March's grid while today is 1 Apr
        let march = build_month_grid(2025, 3, &[], ymd(2025, 4, 1));
        assert!(march.iter().flatten().any(|c| c.date == ymd(2025, 4, 1)));
        assert!(march.iter().flatten().all(|c| !c.is_today));

        let may = build_month_grid(2025, 5, &[], today);
        assert!(may.iter().flatten().all(|c| !c.is_today));
    }

    #[test]
    fn test_holidays_annotated_in_and_out_of_month() {
        let records = vec![
            HolidayRecord::new("Idul Fitri", "2025-03-31"),
            HolidayRecord::new("Idul Fitri", "2025-04-01T00:00:00Z"),
        ];
        let grid = build_month_grid(2025, 3, &records, ymd(2025, 3, 1));
        let flagged: Vec<(NaiveDate, bool)> = grid
            .iter()
            .flatten()
            .filter(|c| c.holiday.is_some())
            .map(|c| (c.date, c.is_current_month))
            .collect();
        assert_eq!(flagged, [(ymd(2025, 3, 31), true), (ymd(2025, 4, 1), false)]);
    }

    #[test]
    fn test_invalid_month_is_empty() {
        assert!(build_month_grid(2025, 0, &[], ymd(2025, 1, 1)).is_empty());
        assert!(build_month_grid(2025, 13, &[], ymd(2025, 1, 1)).is_empty());
    }

    #[test]
    fn test_cursor_navigation() {
        let c = MonthCursor::new(2025, 1);
        assert_eq!(c.prev(), MonthCursor::new(2024, 12));
        assert_eq!(c.next(), MonthCursor::new(2025, 2));
        assert_eq!(MonthCursor::new(2025, 12).next(), MonthCursor::new(2026, 1));
        assert_eq!(MonthCursor::from_date(&ymd(2025, 3, 31)), MonthCursor::new(2025, 3));
        let mut walk = c;
        for _ in 0..12 {
            walk = walk.next();
        }
        assert_eq!(walk, MonthCursor::new(2026, 1));
    }
}
