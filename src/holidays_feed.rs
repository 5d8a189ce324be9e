/*
 *  holidays_feed.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Public holiday calendar feed client and the owned holiday store
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

use log::{error, info};
use reqwest::Client;
use serde::Deserialize;

use crate::feed::{Feed, FeedError};
use crate::holiday::HolidayRecord;

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    #[serde(default)]
    summary: String,
    start: EventStart,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventStart {
    date: Option<String>,
    date_time: Option<String>,
}

/// Maps the calendar feed's event list onto holiday records.
///
/// All-day events carry `start.date`; timed events only `start.dateTime`, which
/// is kept verbatim and trimmed to its date portion by the matcher.
pub fn parse_events(body: &str) -> Result<Vec<HolidayRecord>, FeedError> {
    let list: EventList = serde_json::from_str(body)?;
    list.items
        .into_iter()
        .map(|ev| {
            let date = ev
                .start
                .date
                .or(ev.start.date_time)
                .ok_or_else(|| FeedError::MissingData(format!("no start date for '{}'", ev.summary)))?;
            let record = HolidayRecord::new(&ev.summary, &date);
            Ok(match ev.description.as_deref().map(str::trim) {
                Some(desc) if !desc.is_empty() => record.with_description(desc),
                _ => record,
            })
        })
        .collect()
}

/// Yearly public holiday provider.
#[allow(async_fn_in_trait)]
pub trait HolidaySource {
    /// Holidays for `year`; an empty degraded list when the feed is unreachable.
    async fn fetch_holidays(&self, year: i32) -> Feed<Vec<HolidayRecord>>;
}

#[derive(Debug, Clone)]
pub struct HolidayClient {
    client: Client,
    base_url: String,
    calendar_id: String,
    api_key: String,
}

impl HolidayClient {
    pub fn new(client: Client, base_url: &str, calendar_id: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            calendar_id: calendar_id.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    /// Query window covering all of `year`.
    pub fn year_bounds(year: i32) -> (String, String) {
        (
            format!("{:04}-01-01T00:00:00Z", year),
            format!("{:04}-12-31T23:59:59Z", year),
        )
    }

    async fn request(&self, year: i32) -> Result<Vec<HolidayRecord>, FeedError> {
        let (time_min, time_max) = Self::year_bounds(year);
        let body = self
            .client
            .get(self.events_url())
            .query(&[
                ("key", self.api_key.as_str()),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?
            .error_for_status()? // none 2xx raise
            .text()
            .await?;
        parse_events(&body)
    }
}

impl HolidaySource for HolidayClient {
    async fn fetch_holidays(&self, year: i32) -> Feed<Vec<HolidayRecord>> {
        info!("Fetching holidays for {}...", year);
        match self.request(year).await {
            Ok(records) => {
                info!("Holiday feed returned {} events for {}", records.len(), year);
                Feed::Fresh(records)
            }
            Err(e) => {
                error!("Error fetching holidays: {}", e);
                Feed::degraded(Vec::new(), e)
            }
        }
    }
}

/// The single writable holiday list, read by every panel.
#[derive(Debug, Default)]
pub struct HolidayStore {
    records: Vec<HolidayRecord>,
    year: Option<i32>,
    degraded: Option<String>,
}

impl HolidayStore {
    pub fn records(&self) -> &[HolidayRecord] {
        &self.records
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    /// Why the last load fell back to an empty list, if it did.
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Replaces the list wholesale, a failed load included.
    pub fn apply(&mut self, year: i32, outcome: Feed<Vec<HolidayRecord>>) {
        self.degraded = outcome.reason().map(str::to_string);
        self.records = outcome.into_value();
        self.year = Some(year);
    }
}
