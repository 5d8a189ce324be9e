/*
 *  render.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Screen composition: weather, date, clock, calendar and holiday banner
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

use chrono::{Datelike, NaiveDateTime};
use std::fmt::Write;

use crate::background::Background;
use crate::calendar::{build_month_grid, DayCell, MonthCursor};
use crate::datefmt::{
    format_day_name, format_day_of_month, format_month, format_month_year, format_time,
    format_year, to_date_key, DAY_NAMES_SHORT,
};
use crate::feed::Feed;
use crate::holiday::{holidays_in_month, holidays_on, is_non_working_day, HolidayRecord};
use crate::weather::{icon_url, WeatherStore};

const RED: &str = "\x1b[31m";
const BOLD_RED: &str = "\x1b[1;31m";
const DIM: &str = "\x1b[2m";
const REVERSE: &str = "\x1b[7m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Width of one calendar cell, e.g. `[31]`.
const CELL_WIDTH: usize = 4;
const GRID_WIDTH: usize = CELL_WIDTH * 7;

/// Everything one frame is drawn from. Borrowed, never copied.
pub struct View<'a> {
    /// Local wall-clock time.
    pub now: NaiveDateTime,
    pub month: MonthCursor,
    pub holidays: &'a [HolidayRecord],
    pub holidays_stale: bool,
    pub weather: &'a WeatherStore,
    pub background: Option<&'a Feed<Background>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    /// ANSI colours; off for logs and tests
    pub color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }
}

pub fn render_frame(view: &View, style: Style) -> String {
    let mut out = String::new();
    render_background(&mut out, view);
    render_weather(&mut out, view.weather);
    out.push('\n');
    render_date(&mut out, view, style);
    out.push('\n');
    render_calendar(&mut out, view, style);
    render_banner(&mut out, view, style);
    out
}

fn render_background(out: &mut String, view: &View) {
    if let Some(bg) = view.background {
        let stale = if bg.is_degraded() { " (default)" } else { "" };
        let _ = writeln!(out, "Latar: {}{}", bg.value().url, stale);
    }
}

fn render_weather(out: &mut String, weather: &WeatherStore) {
    if let Some(err) = weather.error() {
        let _ = writeln!(out, "{}", err);
    }
    match weather.snapshot() {
        Some(_) if weather.is_loading() => {
            let _ = writeln!(out, "Sedang meramal cuaca untuk kamu");
        }
        Some(w) => {
            let _ = writeln!(out, "{}°C  {}  [{}]", w.temperature, w.description, w.city);
            let _ = writeln!(out, "Terasa seperti: {}°C  Kelembapan: {}%", w.feels_like, w.humidity);
            let _ = writeln!(out, "{}", icon_url(&w.icon));
            if let Some(at) = weather.last_updated() {
                let _ = writeln!(out, "Diperbarui {}", at.format("%H:%M"));
            }
        }
        None if weather.error().is_none() => {
            let _ = writeln!(out, "...");
        }
        None => {}
    }
}

fn render_date(out: &mut String, view: &View, style: Style) {
    let now = &view.now;
    let off = is_non_working_day(&to_date_key(now), view.holidays, now.weekday());
    let line = format!(
        "{}, {} {} {}",
        format_day_name(now),
        format_day_of_month(now),
        format_month(now),
        format_year(now)
    );
    let _ = writeln!(out, "{}", if off { style.paint(BOLD_RED, &line) } else { line });
    let _ = writeln!(out, "{}", format_time(now));
}

fn cell_text(cell: &DayCell, style: Style) -> String {
    let day = cell.date.day();
    let raw = if cell.is_today {
        format!("[{:>2}]", day)
    } else if cell.holiday.is_some() {
        format!(" {:>2}*", day)
    } else {
        format!(" {:>2} ", day)
    };
    if !style.color {
        return raw;
    }
    match (cell.is_current_month, cell.is_today, cell.holiday.is_some()) {
        (_, true, _) => style.paint(REVERSE, &raw),
        (false, _, _) => style.paint(DIM, &raw),
        (true, _, true) => style.paint(RED, &raw),
        _ => raw,
    }
}

fn render_calendar(out: &mut String, view: &View, style: Style) {
    let MonthCursor { year, month } = view.month;
    let caption = format_month_year(year, month);
    let _ = writeln!(out, "{:^width$}", caption, width = GRID_WIDTH);

    let header: String = DAY_NAMES_SHORT.iter().map(|d| format!("{:^w$}", d, w = CELL_WIDTH)).collect();
    let _ = writeln!(out, "{}", header.trim_end());

    for week in build_month_grid(year, month, view.holidays, view.now.date()) {
        let row: String = week.iter().map(|c| cell_text(c, style)).collect();
        let _ = writeln!(out, "{}", row.trim_end());
    }

    let listed = holidays_in_month(year, month, view.holidays);
    if !listed.is_empty() {
        out.push('\n');
        for (day, h) in listed {
            let _ = writeln!(out, "{:>3}  {}", day, h.name);
        }
    }
    if view.holidays_stale {
        let _ = writeln!(out, "(data hari libur tidak tersedia)");
    }
}

fn render_banner(out: &mut String, view: &View, style: Style) {
    let today = holidays_on(&to_date_key(&view.now), view.holidays);
    if today.is_empty() {
        return;
    }
    out.push('\n');
    for h in today {
        let title = format!("✨ {} ✨", h.name);
        let _ = writeln!(out, "{}", style.paint(YELLOW, &title));
        if let Some(desc) = h.description.as_deref() {
            let _ = writeln!(out, "   {}", desc);
        }
    }
}
