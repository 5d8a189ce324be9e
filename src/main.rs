/*
 *  main.rs
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

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use std::io::IsTerminal;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::LocalSet;

mod background;
mod calendar;
mod config;
mod constants;
mod datefmt;
mod feed;
mod geoloc;
mod holiday;
mod holidays_feed;
mod kvstore;
mod location;
mod render;
mod scheduler;
mod shell;
mod weather;

use background::{BackgroundCache, UnsplashClient};
use constants::FEED_LANG;
use holidays_feed::HolidayClient;
use kvstore::KvStore;
use location::LocationResolver;
use render::Style;
use shell::{Command, Shell, Sources};
use weather::WeatherClient;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Turns Unix signals into shell commands.
///
/// SIGINT and SIGTERM stop the display, SIGHUP forces a refresh of every feed.
async fn signal_handler(tx: mpsc::Sender<Command>) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        let cmd = tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received. Initiating graceful shutdown.");
                Command::Quit
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received. Initiating graceful shutdown.");
                Command::Quit
            }
            _ = sighup.recv() => {
                info!("SIGHUP received. Refreshing all feeds.");
                Command::Refresh
            }
        };
        if tx.send(cmd).await.is_err() || cmd == Command::Quit {
            return Ok(());
        }
    }
}

/// Line oriented keyboard commands, only when attached to a terminal.
async fn key_reader(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(cmd) = Command::from_key(&line) {
            if tx.send(cmd).await.is_err() {
                break;
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = config::Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("{} - ambient wall display", env!("CARGO_PKG_NAME"));
    info!("v.{} ({}) built {}", env!("CARGO_PKG_VERSION"), BUILD_PROFILE, BUILD_DATE);
    let missing = cfg.missing_keys();
    if !missing.is_empty() {
        warn!("No API key configured for: {}", missing.join(", "));
    }

    let client = feed::default_client()?;
    let locator = LocationResolver::new(cfg.location(), geoloc::geoip_client()?);
    let sources = Sources {
        holidays: HolidayClient::new(
            client.clone(),
            cfg.holiday_base_url(),
            cfg.holiday_calendar_id(),
            cfg.holiday_key(),
        ),
        locator,
        weather: WeatherClient::new(client.clone(), cfg.weather_base_url(), cfg.weather_key(), FEED_LANG),
        photos: UnsplashClient::new(client, cfg.photo_base_url(), cfg.photo_key(), cfg.photo_collection_id()),
    };

    let cache_dir = cfg.cache_dir();
    let store = KvStore::open(&cache_dir)
        .with_context(|| format!("opening cache directory {}", cache_dir.display()))?;
    info!("Background cache at {}", store.dir().display());
    let background = BackgroundCache::new(store, cfg.default_image());

    let interactive = std::io::stdout().is_terminal();
    let shell = Shell::new(
        sources,
        background,
        Duration::from_secs(cfg.weather_interval_mins() * 60),
        Style { color: interactive },
    );

    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let local = LocalSet::new();

    if cli.once {
        let frame = local.block_on(&rt, shell.run_once());
        print!("{}", frame);
        rt.shutdown_background();
        return Ok(());
    }

    let (tx, rx) = mpsc::channel(8);
    local.block_on(&rt, async move {
        let signals = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = signal_handler(signals).await {
                warn!("Signal handling unavailable: {}", e);
            }
        });
        if std::io::stdin().is_terminal() {
            info!("Keys: r refresh, n/p next/previous month, t this month, q quit");
            tokio::spawn(key_reader(tx.clone()));
        }
        shell.run(rx).await;
        drop(tx);
    });

    // a pending stdin read would otherwise hold the runtime open
    rt.shutdown_background();
    info!("Shutdown complete");
    Ok(())
}
