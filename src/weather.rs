/*
 *  weather.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Current conditions client and the stale-is-acceptable weather store
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
use chrono::{DateTime, Local};
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::constants::{MSG_LOCATION_DENIED, MSG_WEATHER_FAILED, WEATHER_ICON_URL};
use crate::feed::FeedError;
use crate::location::{LocationError, Locator};

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location error: {0}")]
    Location(#[from] LocationError),
    #[error("Weather feed error: {0}")]
    Feed(#[from] FeedError),
}

impl WeatherError {
    /// Message shown in place of the weather panel.
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Location(LocationError::PermissionDenied) => MSG_LOCATION_DENIED,
            _ => MSG_WEATHER_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub temperature: i64,
    pub feels_like: i64,
    pub humidity: f64,
    pub description: String,
    pub icon: String,
    pub city: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: String,
    icon: String,
}

/// Rounds to the nearest whole degree, halves going up (-2.5 becomes -2).
pub fn round_degrees(t: f64) -> i64 {
    (t + 0.5).floor() as i64
}

/// Icon artwork for a condition code such as `04d`.
pub fn icon_url(icon: &str) -> String {
    format!("{}/{}@4x.png", WEATHER_ICON_URL, icon)
}

pub fn parse_current(body: &str) -> Result<WeatherSnapshot, FeedError> {
    let resp: CurrentResponse = serde_json::from_str(body)?;
    let condition = resp
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::MissingData("weather[0]".to_string()))?;
    Ok(WeatherSnapshot {
        temperature: round_degrees(resp.main.temp),
        feels_like: round_degrees(resp.main.feels_like),
        humidity: resp.main.humidity,
        description: condition.description,
        icon: condition.icon,
        city: resp.name,
    })
}

/// Current-conditions provider for a coordinate.
#[allow(async_fn_in_trait)]
pub trait WeatherSource {
    async fn fetch_current(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, FeedError>;
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    lang: String,
}

impl WeatherClient {
    pub fn new(client: Client, base_url: &str, api_key: &str, lang: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            lang: lang.to_string(),
        }
    }
}

impl WeatherSource for WeatherClient {
    async fn fetch_current(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, FeedError> {
        let body = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
                ("lang", self.lang.clone()),
            ])
            .send()
            .await?
            .error_for_status()? // none 2xx raise
            .text()
            .await?;
        parse_current(&body)
    }
}

/// Owned weather state read by the weather panel.
///
/// The snapshot survives failed refreshes; only a successful fetch replaces it.
#[derive(Debug, Default)]
pub struct WeatherStore {
    snapshot: Option<WeatherSnapshot>,
    error: Option<String>,
    loading: bool,
    last_updated: Option<DateTime<Local>>,
}

impl WeatherStore {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    /// Marks a refresh as in flight; the old snapshot stays on screen.
    pub fn begin_refresh(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Resolves the location, then asks the feed.
    ///
    /// A denied location short-circuits before any request is made.
    pub async fn fetch<L: Locator, S: WeatherSource>(locator: &L, source: &S) -> Result<WeatherSnapshot, WeatherError> {
        let location = locator.locate().await?;
        info!("Fetching weather for {}...", location);
        Ok(source.fetch_current(location.latitude, location.longitude).await?)
    }

    /// Applies a finished fetch. Failures only touch the error message.
    pub fn apply(&mut self, result: Result<WeatherSnapshot, WeatherError>) {
        match result {
            Ok(snapshot) => {
                info!("Weather updated: {} {}°C, {}", snapshot.city, snapshot.temperature, snapshot.description);
                self.snapshot = Some(snapshot);
                self.error = None;
                self.last_updated = Some(Local::now());
            }
            Err(e) => {
                match &e {
                    WeatherError::Location(LocationError::PermissionDenied) => warn!("Weather skipped: {}", e),
                    _ => error!("Error fetching weather data: {}", e),
                }
                self.error = Some(e.user_message().to_string());
            }
        }
        self.loading = false;
    }

    pub async fn refresh<L: Locator, S: WeatherSource>(&mut self, locator: &L, source: &S) {
        self.begin_refresh();
        let result = Self::fetch(locator, source).await;
        self.apply(result);
    }
}
