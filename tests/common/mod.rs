#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use goldsignal::adapters::message_format::{format_cycle, format_reply};
use goldsignal::domain::control::ControlReply;
use goldsignal::domain::cycle::{CycleReport, CycleRunner, RiskSettings};
use goldsignal::domain::decision::DecisionEngine;
use goldsignal::domain::error::{DataError, SignalError};
use goldsignal::domain::market_data::{FetchSettings, MarketDataService};
use goldsignal::domain::sentiment::{default_query, SentimentScorer};
use goldsignal::domain::session::{self, SessionState, SharedSession, TradingMode};
use goldsignal::ports::market_data_port::{Interval, MarketDataPort, RawFrame};
use goldsignal::ports::news_port::{Headline, NewsPort, NewsQuery};
use goldsignal::ports::notification_port::NotificationPort;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

pub const SYMBOL: &str = "GC=F";

/// Entry/exit handshake that parks a provider call until released.
pub struct Gate {
    pub entered: Mutex<Sender<()>>,
    pub release: Mutex<Receiver<()>>,
}

#[derive(Clone)]
pub struct MockMarketData {
    pub daily: Arc<Mutex<Result<RawFrame, DataError>>>,
    pub hourly: Arc<Mutex<Result<RawFrame, DataError>>>,
    pub calls: Arc<AtomicUsize>,
    pub gate: Option<Arc<Gate>>,
}

impl MockMarketData {
    pub fn new(daily: RawFrame, hourly: RawFrame) -> Self {
        Self {
            daily: Arc::new(Mutex::new(Ok(daily))),
            hourly: Arc::new(Mutex::new(Ok(hourly))),
            calls: Arc::new(AtomicUsize::new(0)),
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_hourly(&self, frame: RawFrame) {
        *self.hourly.lock().unwrap() = Ok(frame);
    }

    pub fn fail_daily(&self, err: DataError) {
        *self.daily.lock().unwrap() = Err(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MarketDataPort for MockMarketData {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_bars(
        &self,
        _symbol: &str,
        interval: Interval,
        _lookback_days: u32,
    ) -> Result<RawFrame, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let (Some(gate), Interval::Daily) = (&self.gate, interval) {
            gate.entered.lock().unwrap().send(()).unwrap();
            gate.release.lock().unwrap().recv().unwrap();
        }
        match interval {
            Interval::Daily => self.daily.lock().unwrap().clone(),
            Interval::Hourly => self.hourly.lock().unwrap().clone(),
        }
    }
}

pub struct MockNews {
    pub result: Result<Vec<Headline>, DataError>,
}

impl MockNews {
    pub fn titles(titles: &[&str]) -> Self {
        Self {
            result: Ok(titles
                .iter()
                .map(|t| Headline {
                    title: Some(t.to_string()),
                })
                .collect()),
        }
    }

    pub fn bullish() -> Self {
        Self::titles(&["Gold rally extends", "Safe-haven demand surges", "Fed to cut rates"])
    }

    pub fn bearish() -> Self {
        Self::titles(&["Gold falls", "Strong dollar weighs", "Central banks hike rates"])
    }

    pub fn neutral() -> Self {
        Self::titles(&["Markets quiet ahead of data"])
    }

    pub fn failing() -> Self {
        Self {
            result: Err(DataError::unreachable("HTTP 500")),
        }
    }
}

impl NewsPort for MockNews {
    fn search(&self, _query: &NewsQuery) -> Result<Vec<Headline>, DataError> {
        self.result.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl NotificationPort for RecordingNotifier {
    fn publish_cycle(&self, report: &CycleReport) -> Result<(), SignalError> {
        if let Some(text) = format_cycle(report) {
            self.messages.lock().unwrap().push(text);
        }
        Ok(())
    }

    fn publish_reply(&self, reply: &ControlReply) -> Result<(), SignalError> {
        self.messages.lock().unwrap().push(format_reply(reply));
        Ok(())
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Frame with `high = close + spread`, `low = close - spread`, `open = close`.
pub fn frame_from_closes(
    start: DateTime<Utc>,
    step: Duration,
    closes: &[f64],
    spread: f64,
) -> RawFrame {
    let timestamps = (0..closes.len()).map(|i| start + step * i as i32).collect();
    let col = |offset: f64| closes.iter().map(|c| Some(c + offset)).collect();
    RawFrame {
        timestamps,
        columns: Vec::new(),
    }
    .with_column("Open", col(0.0))
    .with_column("High", col(spread))
    .with_column("Low", col(-spread))
    .with_column("Close", col(0.0))
    .with_column("Volume", closes.iter().map(|_| Some(1_000.0)).collect())
}

/// `base + sign * accel * i²`: strictly trending with growing momentum.
pub fn accelerating(n: usize, base: f64, accel: f64, sign: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base + sign * accel * (i * i) as f64)
        .collect()
}

pub const DAILY_BARS: usize = 260;
pub const HOURLY_BARS: usize = 60 * 24;
const DAILY_ACCEL: f64 = 0.005;
const HOURLY_ACCEL: f64 = 0.0001;
pub const DAILY_SPREAD: f64 = 5.0;

fn last_sq(n: usize) -> f64 {
    ((n - 1) * (n - 1)) as f64
}

/// Hourly series that finishes at `daily_last`, so the latest H4 bar trades
/// around the entry price.
fn hourly_ending_at(daily_last: f64, sign: f64) -> Vec<f64> {
    let base = daily_last - sign * HOURLY_ACCEL * last_sq(HOURLY_BARS);
    accelerating(HOURLY_BARS, base, HOURLY_ACCEL, sign)
}

pub fn hourly_start() -> DateTime<Utc> {
    start() + Duration::days(200)
}

pub fn uptrend_daily_closes() -> Vec<f64> {
    accelerating(DAILY_BARS, 1800.0, DAILY_ACCEL, 1.0)
}

pub fn uptrend_hourly_closes() -> Vec<f64> {
    hourly_ending_at(1800.0 + DAILY_ACCEL * last_sq(DAILY_BARS), 1.0)
}

pub fn uptrend_daily() -> RawFrame {
    frame_from_closes(start(), Duration::days(1), &uptrend_daily_closes(), DAILY_SPREAD)
}

pub fn uptrend_hourly() -> RawFrame {
    frame_from_closes(hourly_start(), Duration::hours(1), &uptrend_hourly_closes(), 1.0)
}

pub fn downtrend_daily() -> RawFrame {
    frame_from_closes(
        start(),
        Duration::days(1),
        &accelerating(DAILY_BARS, 2400.0, DAILY_ACCEL, -1.0),
        DAILY_SPREAD,
    )
}

pub fn downtrend_hourly() -> RawFrame {
    frame_from_closes(
        hourly_start(),
        Duration::hours(1),
        &hourly_ending_at(2400.0 - DAILY_ACCEL * last_sq(DAILY_BARS), -1.0),
        1.0,
    )
}

/// Uptrend hourly data plus one extra bar (opening a new H4 bucket) with the
/// given low and high.
pub fn uptrend_hourly_with_spike(low: f64, high: f64) -> RawFrame {
    let closes = uptrend_hourly_closes();
    let last = *closes.last().unwrap();
    let n = closes.len();
    let mut frame = uptrend_hourly();
    frame.timestamps.push(hourly_start() + Duration::hours(n as i64));
    for column in &mut frame.columns {
        let value = match column.name.as_str() {
            "High" => high,
            "Low" => low,
            "Volume" => 1_000.0,
            _ => last,
        };
        column.values.push(Some(value));
    }
    frame
}

/// Uptrend hourly data with the low of bar `index` pushed down to `low`.
pub fn uptrend_hourly_with_dip(index: usize, low: f64) -> RawFrame {
    let mut frame = uptrend_hourly();
    if let Some(column) = frame.columns.iter_mut().find(|c| c.name == "Low") {
        column.values[index] = Some(low);
    }
    frame
}

pub fn flat(step: Duration, n: usize, price: f64) -> RawFrame {
    frame_from_closes(start(), step, &vec![price; n], 0.0)
}

pub fn running_session() -> SharedSession {
    let mut state = SessionState::new(10_000.0, TradingMode::Demo);
    state.start();
    session::shared(state)
}

pub fn runner(market: MockMarketData, news: MockNews, session: SharedSession) -> CycleRunner {
    let service = MarketDataService::new(Box::new(market), FetchSettings::default());
    let scorer = SentimentScorer::new(Some(Box::new(news)), default_query());
    CycleRunner::new(
        SYMBOL,
        service,
        DecisionEngine::new(scorer),
        RiskSettings::default(),
        session,
    )
}
