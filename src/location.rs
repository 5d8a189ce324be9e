/*
 *  location.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Location service - provides lat/lng from config or geolocation lookup
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

use log::{debug, info, warn};
use reqwest::Client;
use std::fmt;
use thiserror::Error;

use crate::config::LocationConfig;
use crate::constants::GEOIP_URL;
use crate::geoloc::fetch_location;

/// Location information with coordinates
#[derive(Debug, Clone)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub source: LocationSource,
}

/// Source of location data
#[derive(Debug, Clone, PartialEq)]
pub enum LocationSource {
    UserConfig,
    GeoIP,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            LocationSource::UserConfig => "config",
            LocationSource::GeoIP => "geoip",
        };
        match &self.city {
            Some(city) => write!(f, "{} ({:.4}, {:.4}) [{}]", city, self.latitude, self.longitude, source),
            None => write!(f, "({:.4}, {:.4}) [{}]", self.latitude, self.longitude, source),
        }
    }
}

#[derive(Debug, Error)]
pub enum LocationError {
    /// No coordinates configured and the device may not look itself up.
    #[error("Location lookup not permitted")]
    PermissionDenied,
    #[error("GeoIP lookup failed: {0}")]
    Lookup(String),
    #[error("Invalid coordinates")]
    InvalidCoordinates,
}

/// Anything that can tell the weather panel where the device is.
#[allow(async_fn_in_trait)]
pub trait Locator {
    async fn locate(&self) -> Result<Location, LocationError>;
}

pub fn valid_coordinates(lat: f64, lng: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)
}

/// Config first, GeoIP second, and only when the config allows it.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    settings: LocationConfig,
    client: Client,
}

impl LocationResolver {
    pub fn new(settings: LocationConfig, client: Client) -> Self {
        Self { settings, client }
    }

    fn geoip_url(&self) -> &str {
        self.settings.geoip_url.as_deref().unwrap_or(GEOIP_URL)
    }
}

impl Locator for LocationResolver {
    async fn locate(&self) -> Result<Location, LocationError> {
        if let (Some(lat), Some(lng)) = (self.settings.latitude, self.settings.longitude) {
            if !valid_coordinates(lat, lng) {
                warn!("Invalid coordinates in config: {}, {}", lat, lng);
                return Err(LocationError::InvalidCoordinates);
            }
            debug!("Using location from config: {:.4}, {:.4}", lat, lng);
            return Ok(Location {
                latitude: lat,
                longitude: lng,
                city: None,
                source: LocationSource::UserConfig,
            });
        }

        if !self.settings.allow_lookup.unwrap_or(true) {
            warn!("No location in config and GeoIP lookup is disabled");
            return Err(LocationError::PermissionDenied);
        }

        info!("No location in config, attempting GeoIP lookup...");
        match fetch_location(&self.client, self.geoip_url()).await {
            Ok(geo) => {
                info!("GeoIP lookup successful: {} ({:.4}, {:.4})", geo.city, geo.latitude, geo.longitude);
                if !valid_coordinates(geo.latitude, geo.longitude) {
                    return Err(LocationError::InvalidCoordinates);
                }
                Ok(Location {
                    latitude: geo.latitude,
                    longitude: geo.longitude,
                    city: (!geo.city.is_empty()).then_some(geo.city),
                    source: LocationSource::GeoIP,
                })
            }
            Err(e) => {
                warn!("GeoIP lookup failed: {}", e);
                Err(LocationError::Lookup(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(latitude: Option<f64>, longitude: Option<f64>, allow_lookup: Option<bool>) -> LocationResolver {
        let settings = LocationConfig {
            latitude,
            longitude,
            allow_lookup,
            geoip_url: Some("http://127.0.0.1:9/json/".to_string()),
        };
        LocationResolver::new(settings, crate::feed::http_client(200, 500).unwrap())
    }

    #[tokio::test]
    async fn test_config_location() {
        let loc = resolver(Some(-6.2088), Some(106.8456), None).locate().await.unwrap();
        assert_eq!(loc.latitude, -6.2088);
        assert_eq!(loc.longitude, 106.8456);
        assert_eq!(loc.source, LocationSource::UserConfig);
        assert_eq!(loc.to_string(), "(-6.2088, 106.8456) [config]");
    }

    #[tokio::test]
    async fn test_invalid_coordinates() {
        let result = resolver(Some(100.0), Some(-74.0), None).locate().await;
        assert!(matches!(result, Err(LocationError::InvalidCoordinates)));
    }

    #[tokio::test]
    async fn test_lookup_disabled_is_permission_denied() {
        let result = resolver(None, None, Some(false)).locate().await;
        assert!(matches!(result, Err(LocationError::PermissionDenied)));
        // half a coordinate pair counts as none
        let result = resolver(Some(1.0), None, Some(false)).locate().await;
        assert!(matches!(result, Err(LocationError::PermissionDenied)));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_distinct() {
        let result = resolver(None, None, Some(true)).locate().await;
        assert!(matches!(result, Err(LocationError::Lookup(_))));
    }
}
