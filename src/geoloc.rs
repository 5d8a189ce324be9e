/*
 *  geoloc.rs
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
use reqwest::{Client, Error};
use serde::Deserialize;

use crate::constants::{GEOIP_CONNECT_TIMEOUT_MS, GEOIP_TIMEOUT_MS};
use crate::feed::{http_client, FeedError};

#[derive(Debug, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Short-fuse client for the GeoIP lookup.
pub fn geoip_client() -> Result<Client, FeedError> {
    http_client(GEOIP_CONNECT_TIMEOUT_MS, GEOIP_TIMEOUT_MS)
}

pub async fn fetch_location(client: &Client, url: &str) -> Result<GeoLocation, Error> {
    let geo = client
        .get(url)
        .send()
        .await?
        .error_for_status()? // none 2xx raise
        .json::<GeoLocation>()
        .await?;

    Ok(geo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geoip_payload() {
        let body = r#"{"ip":"1.2.3.4","city":"Bandung","region_code":"JB","country_code":"ID",
            "utc_offset":"+0700","latitude":-6.9175,"longitude":107.6191}"#;
        let geo: GeoLocation = serde_json::from_str(body).unwrap();
        assert_eq!(geo.city, "Bandung");
        assert_eq!(geo.latitude, -6.9175);
        assert_eq!(geo.longitude, 107.6191);
    }
}
