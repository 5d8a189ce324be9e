/*
 *  background.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Daily background photo, cached per calendar day
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

use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::BACKGROUND_KEY_PREFIX;
use crate::feed::{Feed, FeedError};
use crate::kvstore::KvStore;

/// Persisted form of today's photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBackground {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cached,
    Fetched,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub url: String,
    pub origin: Origin,
}

/// Something that hands out a random landscape photo URL.
#[allow(async_fn_in_trait)]
pub trait PhotoSource {
    async fn random_photo(&self) -> Result<String, FeedError>;
}

#[derive(Debug, Deserialize)]
struct PhotoResponse {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

pub fn parse_photo(body: &str) -> Result<String, FeedError> {
    let resp: PhotoResponse = serde_json::from_str(body)?;
    Ok(resp.urls.regular)
}

#[derive(Debug, Clone)]
pub struct UnsplashClient {
    client: Client,
    base_url: String,
    access_key: String,
    collection_id: String,
}

impl UnsplashClient {
    pub fn new(client: Client, base_url: &str, access_key: &str, collection_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            collection_id: collection_id.to_string(),
        }
    }
}

impl PhotoSource for UnsplashClient {
    async fn random_photo(&self) -> Result<String, FeedError> {
        let body = self
            .client
            .get(format!("{}/photos/random", self.base_url))
            .query(&[
                ("collections", self.collection_id.as_str()),
                ("orientation", "landscape"),
            ])
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .await?
            .error_for_status()? // none 2xx raise
            .text()
            .await?;
        parse_photo(&body)
    }
}

pub fn cache_key(date_key: &str) -> String {
    format!("{}{}", BACKGROUND_KEY_PREFIX, date_key)
}

/// Today's background, keyed by date in the persisted store.
///
/// Entries for earlier days are never looked at again once the date key
/// moves on, so nothing is evicted explicitly.
#[derive(Debug)]
pub struct BackgroundCache {
    store: KvStore,
    default_image: String,
    current: Option<Feed<Background>>,
}

impl BackgroundCache {
    pub fn new(store: KvStore, default_image: &str) -> Self {
        Self { store, default_image: default_image.to_string(), current: None }
    }

    /// Most recent result, for the renderer.
    pub fn current(&self) -> Option<&Feed<Background>> {
        self.current.as_ref()
    }

    fn cached(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(Some(text)) => match serde_json::from_str::<CachedBackground>(&text) {
                Ok(entry) => Some(entry.image_url),
                Err(e) => {
                    warn!("Dropping unreadable background cache entry {}: {}", key, e);
                    if let Err(e) = self.store.remove(key) {
                        warn!("Could not remove {}: {}", key, e);
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Background cache read failed: {}", e);
                None
            }
        }
    }

    fn store_entry(&self, key: &str, url: &str) {
        let entry = CachedBackground { image_url: url.to_string() };
        let written = serde_json::to_string(&entry)
            .map_err(|e| e.to_string())
            .and_then(|text| self.store.set(key, &text).map_err(|e| e.to_string()));
        if let Err(e) = written {
            error!("Could not persist background for {}: {}", key, e);
        }
    }

    /// Today's cached photo, unless a refresh is forced.
    pub fn lookup(&mut self, today_key: &str, force_refresh: bool) -> Option<Feed<Background>> {
        if force_refresh {
            return None;
        }
        let url = self.cached(&cache_key(today_key))?;
        debug!("Using cached background image for {}", today_key);
        Some(self.remember(Feed::Fresh(Background { url, origin: Origin::Cached })))
    }

    /// Records the outcome of a photo request made for `today_key`.
    ///
    /// A failed fetch falls back to the bundled image and writes nothing, so
    /// the next call tries again.
    pub fn complete(&mut self, today_key: &str, fetched: Result<String, FeedError>) -> Feed<Background> {
        let outcome = match fetched {
            Ok(url) => {
                self.store_entry(&cache_key(today_key), &url);
                Feed::Fresh(Background { url, origin: Origin::Fetched })
            }
            Err(e) => {
                error!("Error fetching background: {}", e);
                Feed::degraded(
                    Background { url: self.default_image.clone(), origin: Origin::Default },
                    e,
                )
            }
        };
        self.remember(outcome)
    }

    /// Returns today's photo, asking the source only on a miss or when forced.
    pub async fn get_background<P: PhotoSource>(
        &mut self,
        source: &P,
        force_refresh: bool,
        today_key: &str,
    ) -> Feed<Background> {
        if let Some(hit) = self.lookup(today_key, force_refresh) {
            return hit;
        }
        info!("Fetching new background image");
        let fetched = source.random_photo().await;
        self.complete(today_key, fetched)
    }

    fn remember(&mut self, outcome: Feed<Background>) -> Feed<Background> {
        self.current = Some(outcome.clone());
        outcome
    }
}
