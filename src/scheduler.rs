/*
 *  scheduler.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Wall-clock aligned timers
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

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use log::info;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

/// Never arm a timer shorter than this, a zero delay would spin at 00:00:00.
const MIN_DELAY: Duration = Duration::from_secs(1);

/// First instant of `date` in `tz`.
///
/// Where a DST jump swallows midnight the first hour that does exist is
/// used; where midnight happens twice, the earlier one.
pub fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    (0..=3).find_map(|hour| {
        let local = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&local).earliest()
    })
}

/// Time left from `now` until the start of `date`, at least `MIN_DELAY`.
pub fn until_start_of<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate) -> Duration {
    match start_of_day(&now.timezone(), date) {
        Some(t) => t
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or(MIN_DELAY)
            .max(MIN_DELAY),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

/// Time left until the next local midnight after `now`.
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    match now.date_naive().succ_opt() {
        Some(tomorrow) => until_start_of(now, tomorrow),
        None => Duration::from_secs(24 * 60 * 60),
    }
}

/// The day to arm for after the timer for `fired` went off on `today`.
///
/// A sleep that wakes a moment before the wall clock turns still counts as
/// `fired`, so the next target is never `fired` again.
pub fn next_target(fired: NaiveDate, today: NaiveDate) -> NaiveDate {
    let after = fired.max(today);
    after.succ_opt().unwrap_or(after)
}

/// One-shot timer for the next local midnight, re-armed from the wall clock
/// after every firing instead of repeating on a fixed period.
pub struct MidnightTimer {
    sleep: Pin<Box<Sleep>>,
    target: NaiveDate,
}

impl MidnightTimer {
    pub fn new() -> Self {
        let now = Local::now();
        let today = now.date_naive();
        let target = today.succ_opt().unwrap_or(today);
        let delay = until_next_midnight(&now);
        log_schedule(delay);
        Self { sleep: Box::pin(sleep(delay)), target }
    }

    /// Resolves at the armed deadline with the day it was armed for.
    /// Cancel safe.
    pub async fn wait(&mut self) -> NaiveDate {
        self.sleep.as_mut().await;
        self.target
    }

    pub fn rearm(&mut self) {
        let now = Local::now();
        self.target = next_target(self.target, now.date_naive());
        let delay = until_start_of(&now, self.target);
        log_schedule(delay);
        self.sleep.as_mut().reset(Instant::now() + delay);
    }
}

impl Default for MidnightTimer {
    fn default() -> Self {
        Self::new()
    }
}

fn log_schedule(delay: Duration) {
    info!("Scheduling background refresh in {} minutes", delay.as_secs() / 60);
}
