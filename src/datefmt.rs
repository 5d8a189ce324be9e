/*
 *  datefmt.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Display strings and canonical date keys, fixed id-ID locale
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

use chrono::{Datelike, Timelike};

/// Indexed by days-from-Sunday.
pub const DAY_NAMES: [&str; 7] = ["Minggu", "Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu"];
pub const DAY_NAMES_SHORT: [&str; 7] = ["Min", "Sen", "Sel", "Rab", "Kam", "Jum", "Sab"];

/// Indexed by month0.
pub const MONTH_NAMES: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];
pub const MONTH_NAMES_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun",
    "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

/// 24-hour `HH:MM:SS`.
pub fn format_time<T: Timelike>(t: &T) -> String {
    format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
}

pub fn format_day_of_month<T: Datelike>(t: &T) -> String {
    t.day().to_string()
}

pub fn format_month<T: Datelike>(t: &T) -> &'static str {
    MONTH_NAMES_SHORT[t.month0() as usize]
}

pub fn format_year<T: Datelike>(t: &T) -> String {
    format!("{:04}", t.year())
}

pub fn format_day_name<T: Datelike>(t: &T) -> &'static str {
    DAY_NAMES[t.weekday().num_days_from_sunday() as usize]
}

/// Calendar caption, e.g. `Maret 2025`. Out of range months render as `?`.
pub fn format_month_year(year: i32, month: u32) -> String {
    let name = month
        .checked_sub(1)
        .and_then(|m| MONTH_NAMES.get(m as usize))
        .copied()
        .unwrap_or("?");
    format!("{} {}", name, year)
}

/// Canonical `YYYY-MM-DD` key from the local calendar fields.
///
/// Every date comparison in the dashboard joins on this string, so it must be
/// built from the value's own fields and never from a UTC conversion.
pub fn to_date_key<T: Datelike>(t: &T) -> String {
    format!("{:04}-{:02}-{:02}", t.year(), t.month(), t.day())
}
