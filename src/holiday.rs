/*
 *  holiday.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Holiday records and date matching
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

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::datefmt::to_date_key;

/// One event from the holiday feed.
///
/// `date` is kept exactly as the feed sent it: either `YYYY-MM-DD` or a full
/// timestamp such as `2025-03-31T00:00:00+07:00`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub name: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl HolidayRecord {
    pub fn new(name: &str, date: &str) -> Self {
        Self {
            name: name.to_string(),
            date: date.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// The date portion of `date`, see [`date_portion`].
    pub fn date_key(&self) -> &str {
        date_portion(&self.date)
    }
}

/// Everything before the first `T`, or the whole string.
pub fn date_portion(date: &str) -> &str {
    match date.split_once('T') {
        Some((day, _)) => day,
        None => date,
    }
}

/// Parses the date portion as a calendar date. Only the canonical zero padded
/// form is accepted, anything [`is_holiday`] could never match yields `None`.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let day = date_portion(date);
    let parsed = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    (to_date_key(&parsed) == day).then_some(parsed)
}

/// First record, in input order, falling on `date_key`.
pub fn is_holiday<'a>(date_key: &str, records: &'a [HolidayRecord]) -> Option<&'a HolidayRecord> {
    records.iter().find(|r| r.date_key() == date_key)
}

/// Every record falling on `date_key`, in input order.
pub fn holidays_on<'a>(date_key: &str, records: &'a [HolidayRecord]) -> Vec<&'a HolidayRecord> {
    records.iter().filter(|r| r.date_key() == date_key).collect()
}

/// Sundays are always off, whatever the feed says.
pub fn is_non_working_day(date_key: &str, records: &[HolidayRecord], weekday: Weekday) -> bool {
    weekday == Weekday::Sun || is_holiday(date_key, records).is_some()
}

/// Records falling in `year`/`month`, with their day of month, in input order.
///
/// Built on [`parse_date`], so a record listed here is exactly one that
/// [`is_holiday`] would match for some key in that month.
pub fn holidays_in_month(year: i32, month: u32, records: &[HolidayRecord]) -> Vec<(u32, &HolidayRecord)> {
    records
        .iter()
        .filter_map(|r| {
            let d = parse_date(&r.date)?;
            (d.year() == year && d.month() == month).then_some((d.day(), r))
        })
        .collect()
}
