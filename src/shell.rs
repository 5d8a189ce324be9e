/*
 *  shell.rs
 *
 *  mirrorboard - ambient wall display
 *	(c) 2020-26 Stuart Hunter
 *
 *  Screen owner: clock tick, feed timers, forced refresh and teardown
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

use chrono::{Datelike, Local, NaiveDate};
use log::{debug, info};
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::background::{BackgroundCache, PhotoSource};
use crate::calendar::MonthCursor;
use crate::constants::CLOCK_TICK_MS;
use crate::datefmt::to_date_key;
use crate::feed::{Feed, FeedError};
use crate::holiday::HolidayRecord;
use crate::holidays_feed::{HolidaySource, HolidayStore};
use crate::location::Locator;
use crate::render::{render_frame, Style, View};
use crate::scheduler::MidnightTimer;
use crate::weather::{WeatherError, WeatherSnapshot, WeatherSource, WeatherStore};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Operator input, from the keyboard or a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    PrevMonth,
    NextMonth,
    ThisMonth,
    Quit,
}

impl Command {
    /// One command per input line, e.g. `r` then Enter.
    pub fn from_key(line: &str) -> Option<Self> {
        match line.trim() {
            "r" | "R" => Some(Command::Refresh),
            "p" | "<" => Some(Command::PrevMonth),
            "n" | ">" => Some(Command::NextMonth),
            "t" | "T" => Some(Command::ThisMonth),
            "q" | "Q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// The remote collaborators the screen pulls from.
pub struct Sources<H, L, W, P> {
    pub holidays: H,
    pub locator: L,
    pub weather: W,
    pub photos: P,
}

/// Finished fetch results, applied on the loop that owns the state.
enum Update {
    Holidays(i32, Feed<Vec<HolidayRecord>>),
    Weather(u64, Result<WeatherSnapshot, WeatherError>),
    Background(String, Result<String, FeedError>),
    Refreshed(Vec<Update>),
}

/// Owns every piece of screen state and the timers that feed it.
///
/// Fetches run as local tasks and report back over a channel, so the clock
/// keeps ticking while a slow feed is being waited on.
pub struct Shell<H, L, W, P> {
    sources: Rc<Sources<H, L, W, P>>,
    holidays: HolidayStore,
    weather: WeatherStore,
    background: BackgroundCache,
    month: MonthCursor,
    style: Style,
    weather_every: Duration,
    refreshing: bool,
    weather_seq: u64,
    pending: usize,
    tasks: Vec<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Update>,
    rx: mpsc::UnboundedReceiver<Update>,
}

impl<H, L, W, P> Shell<H, L, W, P>
where
    H: HolidaySource + 'static,
    L: Locator + 'static,
    W: WeatherSource + 'static,
    P: PhotoSource + 'static,
{
    pub fn new(sources: Sources<H, L, W, P>, background: BackgroundCache, weather_every: Duration, style: Style) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            sources: Rc::new(sources),
            holidays: HolidayStore::default(),
            weather: WeatherStore::default(),
            background,
            month: MonthCursor::from_date(&Local::now()),
            style,
            weather_every,
            refreshing: false,
            weather_seq: 0,
            pending: 0,
            tasks: Vec::new(),
            tx,
            rx,
        }
    }

    /// Renders the current state against the wall clock.
    pub fn frame(&self) -> String {
        let view = View {
            now: Local::now().naive_local(),
            month: self.month,
            holidays: self.holidays.records(),
            holidays_stale: self.holidays.degraded_reason().is_some(),
            weather: &self.weather,
            background: self.background.current(),
        };
        render_frame(&view, self.style)
    }

    fn draw(&self) {
        let frame = self.frame();
        let mut out = std::io::stdout().lock();
        let clear = if self.style.color { CLEAR_SCREEN } else { "" };
        if let Err(e) = write!(out, "{}{}", clear, frame).and_then(|_| out.flush()) {
            debug!("Frame write failed: {}", e);
        }
    }

    fn spawn(&mut self, work: impl std::future::Future<Output = Update> + 'static) {
        let tx = self.tx.clone();
        self.tasks.retain(|h| !h.is_finished());
        self.pending += 1;
        self.tasks.push(task::spawn_local(async move {
            let _ = tx.send(work.await);
        }));
    }

    fn spawn_holidays(&mut self, year: i32) {
        let sources = Rc::clone(&self.sources);
        self.spawn(async move { Update::Holidays(year, sources.holidays.fetch_holidays(year).await) });
    }

    fn spawn_weather(&mut self) {
        if self.weather.is_loading() {
            debug!("Weather fetch already in flight");
            return;
        }
        let seq = self.begin_weather();
        let sources = Rc::clone(&self.sources);
        self.spawn(async move { Update::Weather(seq, WeatherStore::fetch(&sources.locator, &sources.weather).await) });
    }

    /// Starts a weather fetch; only the result of the newest one is applied.
    fn begin_weather(&mut self) -> u64 {
        self.weather.begin_refresh();
        self.weather_seq += 1;
        self.weather_seq
    }

    fn spawn_background(&mut self, key: String, force_refresh: bool) {
        if self.background.lookup(&key, force_refresh).is_some() {
            return;
        }
        info!("Fetching new background image");
        let sources = Rc::clone(&self.sources);
        self.spawn(async move { Update::Background(key, sources.photos.random_photo().await) });
    }

    /// Initial load of all three feeds.
    pub fn startup(&mut self) {
        self.spawn_holidays(Local::now().year());
        self.spawn_weather();
        self.spawn_background(to_date_key(&Local::now()), false);
    }

    /// Refetches holidays, weather and a new background together and applies
    /// them once all three have settled. A failing feed does not hold back
    /// the others. Ignored while a refresh is already running.
    pub fn refresh_all(&mut self) {
        if self.refreshing {
            debug!("Refresh already running");
            return;
        }
        info!("Refreshing all feeds");
        self.refreshing = true;
        let seq = self.begin_weather();

        let year = Local::now().year();
        let key = to_date_key(&Local::now());
        let sources = Rc::clone(&self.sources);
        self.spawn(async move {
            let (holidays, weather, photo) = tokio::join!(
                sources.holidays.fetch_holidays(year),
                WeatherStore::fetch(&sources.locator, &sources.weather),
                sources.photos.random_photo(),
            );
            Update::Refreshed(vec![
                Update::Holidays(year, holidays),
                Update::Weather(seq, weather),
                Update::Background(key, photo),
            ])
        });
    }

    fn on_midnight(&mut self, today: NaiveDate) {
        info!("Day changed to {}", to_date_key(&today));
        self.month = MonthCursor::from_date(&today);
        if self.holidays.year() != Some(today.year()) {
            self.spawn_holidays(today.year());
        }
        self.spawn_background(to_date_key(&today), true);
    }

    fn apply(&mut self, update: Update) {
        match update {
            Update::Holidays(year, outcome) => self.holidays.apply(year, outcome),
            Update::Weather(seq, result) if seq == self.weather_seq => self.weather.apply(result),
            Update::Weather(seq, _) => debug!("Dropping superseded weather result #{}", seq),
            Update::Background(key, fetched) => {
                self.background.complete(&key, fetched);
            }
            Update::Refreshed(batch) => {
                for u in batch {
                    self.apply(u);
                }
                self.refreshing = false;
                info!("Refresh complete");
            }
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Refresh => self.refresh_all(),
            Command::PrevMonth => self.month = self.month.prev(),
            Command::NextMonth => self.month = self.month.next(),
            Command::ThisMonth => self.month = MonthCursor::from_date(&Local::now()),
            Command::Quit => {}
        }
    }

    /// Waits until every spawned fetch has reported back.
    #[cfg(test)]
    async fn settle(&mut self) {
        while self.pending > 0 {
            match self.rx.recv().await {
                Some(update) => {
                    self.pending -= 1;
                    self.apply(update);
                }
                None => break,
            }
        }
    }

    /// Loads every feed once, sequentially awaited, and returns the frame.
    pub async fn run_once(mut self) -> String {
        let year = Local::now().year();
        let key = to_date_key(&Local::now());
        let sources = Rc::clone(&self.sources);
        let (holidays, (), _) = tokio::join!(
            sources.holidays.fetch_holidays(year),
            self.weather.refresh(&sources.locator, &sources.weather),
            self.background.get_background(&sources.photos, false, &key),
        );
        self.holidays.apply(year, holidays);
        self.frame()
    }

    /// Main loop. Must run inside a `LocalSet`; returns on `Quit` or once
    /// the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        self.startup();

        let mut clock = interval(Duration::from_millis(CLOCK_TICK_MS));
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut weather_tick = interval_at(Instant::now() + self.weather_every, self.weather_every);
        weather_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut midnight = MidnightTimer::new();

        info!("Weather refresh every {} minutes", self.weather_every.as_secs() / 60);
        loop {
            tokio::select! {
                _ = clock.tick() => self.draw(),
                _ = weather_tick.tick() => self.spawn_weather(),
                today = midnight.wait() => {
                    self.on_midnight(today);
                    midnight.rearm();
                }
                Some(update) = self.rx.recv() => {
                    self.pending = self.pending.saturating_sub(1);
                    self.apply(update);
                    self.draw();
                }
                cmd = commands.recv() => match cmd {
                    Some(Command::Quit) | None => break,
                    Some(cmd) => {
                        self.handle(cmd);
                        self.draw();
                    }
                },
            }
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        let live = self.tasks.iter().filter(|h| !h.is_finished()).count();
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        info!("Display loop stopped, {} fetches cancelled", live);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{cache_key, Origin};
    use crate::kvstore::KvStore;
    use crate::location::{Location, LocationError, LocationSource};
    use std::cell::Cell;

    struct FakeHolidays {
        calls: Cell<usize>,
        fail: bool,
    }

    impl HolidaySource for FakeHolidays {
        async fn fetch_holidays(&self, year: i32) -> Feed<Vec<HolidayRecord>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Feed::degraded(Vec::new(), "HTTP 403")
            } else {
                Feed::Fresh(vec![HolidayRecord::new("Tahun Baru", &format!("{}-01-01", year))])
            }
        }
    }

    struct FakeLocator;

    impl Locator for FakeLocator {
        async fn locate(&self) -> Result<Location, LocationError> {
            Ok(Location { latitude: -6.2, longitude: 106.8, city: None, source: LocationSource::UserConfig })
        }
    }

    struct FakeWeather {
        calls: Cell<usize>,
        // the first call answers only after this long
        first_lag: Duration,
    }

    impl WeatherSource for FakeWeather {
        async fn fetch_current(&self, _lat: f64, _lon: f64) -> Result<WeatherSnapshot, FeedError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n == 1 && !self.first_lag.is_zero() {
                tokio::time::sleep(self.first_lag).await;
            }
            Ok(WeatherSnapshot {
                temperature: 28 + n as i64,
                feels_like: 33,
                humidity: 80.0,
                description: "hujan ringan".to_string(),
                icon: "10d".to_string(),
                city: "Jakarta".to_string(),
            })
        }
    }

    struct FakePhotos {
        calls: Cell<usize>,
        fail: bool,
    }

    impl PhotoSource for FakePhotos {
        async fn random_photo(&self) -> Result<String, FeedError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if self.fail {
                Err(FeedError::MissingData("rate limited".to_string()))
            } else {
                Ok(format!("https://images.example/{}.jpg", n))
            }
        }
    }

    type TestShell = Shell<FakeHolidays, FakeLocator, FakeWeather, FakePhotos>;

    fn shell(dir: &tempfile::TempDir, holidays_fail: bool, photos_fail: bool) -> TestShell {
        let sources = Sources {
            holidays: FakeHolidays { calls: Cell::new(0), fail: holidays_fail },
            locator: FakeLocator,
            weather: FakeWeather { calls: Cell::new(0), first_lag: Duration::ZERO },
            photos: FakePhotos { calls: Cell::new(0), fail: photos_fail },
        };
        let cache = BackgroundCache::new(KvStore::open(dir.path()).unwrap(), "default.jpg");
        Shell::new(sources, cache, Duration::from_secs(1800), Style::default())
    }

    #[tokio::test]
    async fn test_startup_loads_every_feed() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, false, true);
                shell.startup();
                shell.settle().await;

                assert_eq!(shell.holidays.records().len(), 1);
                assert!(shell.weather.snapshot().is_some());
                let bg = shell.background.current().unwrap();
                assert!(bg.is_degraded());
                assert_eq!(bg.value().url, "default.jpg");
                assert!(shell.frame().contains("29°C  hujan ringan  [Jakarta]"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_refresh_tolerates_a_failing_feed() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, true, false);
                shell.refresh_all();
                assert!(shell.weather.is_loading());
                shell.settle().await;

                assert!(!shell.refreshing);
                assert_eq!(shell.holidays.degraded_reason(), Some("HTTP 403"));
                assert!(shell.weather.snapshot().is_some());
                assert!(!shell.weather.is_loading());
                let bg = shell.background.current().unwrap();
                assert_eq!(bg.value().origin, Origin::Fetched);
                assert!(shell.frame().contains("(data hari libur tidak tersedia)"));
            })
            .await;
    }

    #[tokio::test]
    async fn test_refresh_forces_new_background() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, false, false);
                shell.startup();
                shell.settle().await;
                assert_eq!(shell.sources.photos.calls.get(), 1);

                // cached for today, startup path does not ask again
                shell.spawn_background(to_date_key(&Local::now()), false);
                shell.settle().await;
                assert_eq!(shell.sources.photos.calls.get(), 1);
                assert_eq!(shell.background.current().unwrap().value().origin, Origin::Cached);

                shell.refresh_all();
                shell.settle().await;
                assert_eq!(shell.sources.photos.calls.get(), 2);
                assert_eq!(shell.background.current().unwrap().value().url, "https://images.example/2.jpg");
            })
            .await;
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, false, false);
                shell.refresh_all();
                shell.refresh_all();
                shell.settle().await;
                assert_eq!(shell.sources.holidays.calls.get(), 1);
                assert_eq!(shell.sources.weather.calls.get(), 1);
                assert_eq!(shell.sources.photos.calls.get(), 1);

                shell.refresh_all();
                shell.settle().await;
                assert_eq!(shell.sources.photos.calls.get(), 2);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_weather_never_overwrites_refresh() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, false, false);
                Rc::get_mut(&mut shell.sources).unwrap().weather.first_lag = Duration::from_secs(5);

                // timer fetch still in flight when the forced refresh starts
                shell.spawn_weather();
                shell.refresh_all();
                shell.spawn_weather();
                shell.settle().await;

                assert_eq!(shell.sources.weather.calls.get(), 2);
                assert_eq!(shell.weather.snapshot().unwrap().temperature, 30);
                assert!(!shell.weather.is_loading());
            })
            .await;
    }

    #[tokio::test]
    async fn test_midnight_uses_the_armed_day() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let mut shell = shell(&dir, false, false);
                let day = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
                shell.on_midnight(day);
                shell.settle().await;

                assert_eq!(shell.month, MonthCursor::new(2030, 1));
                assert_eq!(shell.holidays.year(), Some(2030));
                let file = dir.path().join(format!("{}.json", cache_key("2030-01-01")));
                assert!(file.exists());
                assert_eq!(shell.sources.photos.calls.get(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_run_once_renders_loaded_state() {
        let dir = tempfile::tempdir().unwrap();
        let frame = shell(&dir, false, false).run_once().await;
        assert!(frame.starts_with("Latar: https://images.example/1.jpg\n"));
        assert!(frame.contains("Terasa seperti: 33°C  Kelembapan: 80%"));
    }

    #[tokio::test]
    async fn test_quit_and_closed_channel_end_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        task::LocalSet::new()
            .run_until(async {
                let (tx, rx) = mpsc::channel(4);
                tx.send(Command::Quit).await.unwrap();
                shell(&dir, false, false).run(rx).await;

                let (tx, rx) = mpsc::channel::<Command>(4);
                drop(tx);
                shell(&dir, false, false).run(rx).await;
            })
            .await;
    }

    #[test]
    fn test_month_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let mut shell = shell(&dir, false, false);
        let start = shell.month;
        shell.handle(Command::NextMonth);
        assert_eq!(shell.month, start.next());
        shell.handle(Command::PrevMonth);
        shell.handle(Command::PrevMonth);
        assert_eq!(shell.month, start.prev());
        shell.handle(Command::ThisMonth);
        assert_eq!(shell.month, start);
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(Command::from_key("r\n"), Some(Command::Refresh));
        assert_eq!(Command::from_key(" q "), Some(Command::Quit));
        assert_eq!(Command::from_key(">"), Some(Command::NextMonth));
        assert_eq!(Command::from_key("p"), Some(Command::PrevMonth));
        assert_eq!(Command::from_key("t"), Some(Command::ThisMonth));
        assert_eq!(Command::from_key("hello"), None);
        assert_eq!(Command::from_key(""), None);
    }
}
