use clap::{ArgAction, Parser, ValueHint};
use dirs_next::{cache_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::constants::{
    HOLIDAY_BASE_URL, HOLIDAY_CALENDAR_ID, PHOTO_BASE_URL, PHOTO_COLLECTION_ID,
    WEATHER_BASE_URL, WEATHER_INTERVAL_MINS, DEFAULT_BACKGROUND,
};
use crate::location::valid_coordinates;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// where the daily background entry is persisted
    pub cache_dir: Option<PathBuf>,
    pub weather: Option<WeatherConfig>,
    pub holidays: Option<HolidayConfig>,
    pub photos: Option<PhotoConfig>,
    pub location: Option<LocationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub interval_mins: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HolidayConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub calendar_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PhotoConfig {
    pub access_key: Option<String>,
    pub base_url: Option<String>,
    pub collection_id: Option<String>,
    pub default_image: Option<String>,
}

/// Fixed coordinates, or permission to look the device up by IP.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// `false` is the equivalent of denying location access
    pub allow_lookup: Option<bool>,
    pub geoip_url: Option<String>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "mirrorboard", version, about = "Always-on clock, calendar and weather wall display")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub cache_dir: Option<PathBuf>,
    #[arg(long, env = "MIRRORBOARD_WEATHER_KEY")]
    pub weather_key: Option<String>,
    #[arg(long, env = "MIRRORBOARD_HOLIDAY_KEY")]
    pub holiday_key: Option<String>,
    #[arg(long, env = "MIRRORBOARD_PHOTO_KEY")]
    pub photo_key: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: Option<f64>,
    /// never look the device up by IP
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_geoip: bool,
    #[arg(long)]
    pub weather_interval_mins: Option<u64>,
    /// fetch everything, print a single frame and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub once: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML, merge CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/mirrorboard/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/mirrorboard/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/mirrorboard.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["mirrorboard.yaml", "config.yaml", "config/mirrorboard.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Overwrite `dst` with `src` wherever `src` has a value.
macro_rules! take_some {
    ($dst:expr, $src:expr, $($field:ident),+) => {
        $( if $src.$field.is_some() { $dst.$field = $src.$field; } )+
    };
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    take_some!(dst, src, log_level, cache_dir);
    match (&mut dst.weather, src.weather) {
        (None, Some(s)) => dst.weather = Some(s),
        (Some(d), Some(s)) => { take_some!(d, s, api_key, base_url, interval_mins); }
        _ => {}
    }
    match (&mut dst.holidays, src.holidays) {
        (None, Some(s)) => dst.holidays = Some(s),
        (Some(d), Some(s)) => { take_some!(d, s, api_key, base_url, calendar_id); }
        _ => {}
    }
    match (&mut dst.photos, src.photos) {
        (None, Some(s)) => dst.photos = Some(s),
        (Some(d), Some(s)) => { take_some!(d, s, access_key, base_url, collection_id, default_image); }
        _ => {}
    }
    match (&mut dst.location, src.location) {
        (None, Some(s)) => dst.location = Some(s),
        (Some(d), Some(s)) => { take_some!(d, s, latitude, longitude, allow_lookup, geoip_url); }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.debug { cfg.log_level = Some("debug".to_string()); }
    if cli.cache_dir.is_some() { cfg.cache_dir = cli.cache_dir.clone(); }

    if cli.weather_key.is_some() || cli.weather_interval_mins.is_some() {
        let w = cfg.weather.get_or_insert_with(WeatherConfig::default);
        if cli.weather_key.is_some() { w.api_key = cli.weather_key.clone(); }
        if cli.weather_interval_mins.is_some() { w.interval_mins = cli.weather_interval_mins; }
    }
    if cli.holiday_key.is_some() {
        cfg.holidays.get_or_insert_with(HolidayConfig::default).api_key = cli.holiday_key.clone();
    }
    if cli.photo_key.is_some() {
        cfg.photos.get_or_insert_with(PhotoConfig::default).access_key = cli.photo_key.clone();
    }
    if cli.latitude.is_some() || cli.longitude.is_some() || cli.no_geoip {
        let l = cfg.location.get_or_insert_with(LocationConfig::default);
        if cli.latitude.is_some() { l.latitude = cli.latitude; }
        if cli.longitude.is_some() { l.longitude = cli.longitude; }
        if cli.no_geoip { l.allow_lookup = Some(false); }
    }
}

fn empty_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| k.trim().is_empty())
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(loc) = cfg.location.as_ref() {
        match (loc.latitude, loc.longitude) {
            (Some(lat), Some(lng)) if !valid_coordinates(lat, lng) => {
                return Err(ConfigError::Validation(format!("coordinates out of range: {}, {}", lat, lng)));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Validation("latitude and longitude must be given together".into()));
            }
            _ => {}
        }
    }
    if let Some(w) = cfg.weather.as_ref() {
        if w.interval_mins == Some(0) {
            return Err(ConfigError::Validation("weather interval_mins must be > 0".into()));
        }
        if empty_key(&w.api_key) {
            return Err(ConfigError::Validation("weather api_key is empty".into()));
        }
    }
    if cfg.holidays.as_ref().is_some_and(|h| empty_key(&h.api_key)) {
        return Err(ConfigError::Validation("holidays api_key is empty".into()));
    }
    if cfg.photos.as_ref().is_some_and(|p| empty_key(&p.access_key)) {
        return Err(ConfigError::Validation("photos access_key is empty".into()));
    }
    Ok(())
}

/// Effective values with built-in defaults filled in.
impl Config {
    pub fn weather_interval_mins(&self) -> u64 {
        self.weather.as_ref().and_then(|w| w.interval_mins).unwrap_or(WEATHER_INTERVAL_MINS)
    }

    pub fn weather_base_url(&self) -> &str {
        self.weather.as_ref().and_then(|w| w.base_url.as_deref()).unwrap_or(WEATHER_BASE_URL)
    }

    pub fn weather_key(&self) -> &str {
        self.weather.as_ref().and_then(|w| w.api_key.as_deref()).unwrap_or_default()
    }

    pub fn holiday_base_url(&self) -> &str {
        self.holidays.as_ref().and_then(|h| h.base_url.as_deref()).unwrap_or(HOLIDAY_BASE_URL)
    }

    pub fn holiday_calendar_id(&self) -> &str {
        self.holidays.as_ref().and_then(|h| h.calendar_id.as_deref()).unwrap_or(HOLIDAY_CALENDAR_ID)
    }

    pub fn holiday_key(&self) -> &str {
        self.holidays.as_ref().and_then(|h| h.api_key.as_deref()).unwrap_or_default()
    }

    pub fn photo_base_url(&self) -> &str {
        self.photos.as_ref().and_then(|p| p.base_url.as_deref()).unwrap_or(PHOTO_BASE_URL)
    }

    pub fn photo_collection_id(&self) -> &str {
        self.photos.as_ref().and_then(|p| p.collection_id.as_deref()).unwrap_or(PHOTO_COLLECTION_ID)
    }

    pub fn photo_key(&self) -> &str {
        self.photos.as_ref().and_then(|p| p.access_key.as_deref()).unwrap_or_default()
    }

    pub fn default_image(&self) -> &str {
        self.photos.as_ref().and_then(|p| p.default_image.as_deref()).unwrap_or(DEFAULT_BACKGROUND)
    }

    pub fn location(&self) -> LocationConfig {
        self.location.clone().unwrap_or_default()
    }

    /// `~/.cache/mirrorboard` unless configured.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| cache_dir().map(|d| d.join("mirrorboard")))
            .unwrap_or_else(|| PathBuf::from(".mirrorboard-cache"))
    }

    /// Names of feeds started without credentials, for a startup warning.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.weather_key().is_empty() { missing.push("weather"); }
        if self.holiday_key().is_empty() { missing.push("holidays"); }
        if self.photo_key().is_empty() { missing.push("photos"); }
        missing
    }
}
