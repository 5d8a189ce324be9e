/*
 *  feed.rs
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

use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{CONNECT_TIMEOUT_MS, REQUEST_TIMEOUT_MS, USER_AGENT};

/// Transport level failures shared by the feed clients.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing data: {0}")]
    MissingData(String),
}

/// A feed value tagged with how it was obtained.
///
/// Feeds never fail outward: on error they hand back a safe default, but the
/// `Degraded` tag keeps "nothing there" apart from "could not ask".
#[derive(Debug, Clone, PartialEq)]
pub enum Feed<T> {
    Fresh(T),
    Degraded { value: T, reason: String },
}

impl<T> Feed<T> {
    pub fn degraded(value: T, reason: impl ToString) -> Self {
        Feed::Degraded { value, reason: reason.to_string() }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Feed::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Feed::Fresh(v) | Feed::Degraded { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Feed::Fresh(v) | Feed::Degraded { value: v, .. } => v,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Feed::Fresh(_) => None,
            Feed::Degraded { reason, .. } => Some(reason.as_str()),
        }
    }
}

/// Shared reqwest client setup: identifying headers and bounded timeouts.
pub fn http_client(connect_ms: u64, timeout_ms: u64) -> Result<Client, FeedError> {
    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .connect_timeout(Duration::from_millis(connect_ms))
        .default_headers(headers)
        .timeout(Duration::from_millis(timeout_ms))
        .build()?;
    Ok(client)
}

pub fn default_client() -> Result<Client, FeedError> {
    http_client(CONNECT_TIMEOUT_MS, REQUEST_TIMEOUT_MS)
}
