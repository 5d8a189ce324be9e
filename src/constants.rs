/*
 *  constants.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
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

/// User-Agent sent with every feed request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

// Feed endpoints
pub const WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const WEATHER_ICON_URL: &str = "https://openweathermap.org/img/wn";
pub const HOLIDAY_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
/// Indonesian public holidays, already percent-encoded for the path segment.
pub const HOLIDAY_CALENDAR_ID: &str = "id.indonesian%23holiday%40group.v.calendar.google.com";
pub const PHOTO_BASE_URL: &str = "https://api.unsplash.com";
pub const PHOTO_COLLECTION_ID: &str = "317099";
pub const GEOIP_URL: &str = "https://ipapi.co/json/";

/// Shown whenever no photo could be fetched for today.
pub const DEFAULT_BACKGROUND: &str = "assets/backgrounds/default.jpg";

/// Feed language passed to the weather service.
pub const FEED_LANG: &str = "id";

// Timers
pub const CLOCK_TICK_MS: u64 = 1_000;
pub const WEATHER_INTERVAL_MINS: u64 = 30;

// HTTP timeouts
pub const CONNECT_TIMEOUT_MS: u64 = 2_000;
pub const REQUEST_TIMEOUT_MS: u64 = 8_000;
/// GeoIP is best effort, keep it snappy.
pub const GEOIP_CONNECT_TIMEOUT_MS: u64 = 500;
pub const GEOIP_TIMEOUT_MS: u64 = 1_500;

/// Key prefix for the per-day background entry in the persisted store.
pub const BACKGROUND_KEY_PREFIX: &str = "background_";

/// User visible weather errors.
pub const MSG_LOCATION_DENIED: &str = "Permission to access location was denied";
pub const MSG_WEATHER_FAILED: &str = "Failed to fetch location or weather data";
