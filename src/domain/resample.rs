//! Fixed-width time bucketing of finer bars into coarser ones.

use chrono::{DateTime, Utc};

use crate::domain::ohlcv::OhlcvBar;

pub const FOUR_HOURS_SECS: i64 = 4 * 60 * 60;

/// Bucket start for `timestamp`, aligned to UTC multiples of `width_secs`.
pub fn bucket_start(timestamp: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let secs = timestamp.timestamp();
    let start = secs - secs.rem_euclid(width_secs);
    DateTime::from_timestamp(start, 0).unwrap_or(timestamp)
}

#[derive(Debug)]
struct Bucket {
    start: DateTime<Utc>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: f64,
}

impl Bucket {
    fn new(start: DateTime<Utc>) -> Self {
        Bucket {
            start,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: 0.0,
        }
    }

    fn push(&mut self, bar: &OhlcvBar) {
        let finite = |v: f64| v.is_finite().then_some(v);
        if self.open.is_none() {
            self.open = finite(bar.open);
        }
        if let Some(h) = finite(bar.high) {
            self.high = Some(self.high.map_or(h, |cur| cur.max(h)));
        }
        if let Some(l) = finite(bar.low) {
            self.low = Some(self.low.map_or(l, |cur| cur.min(l)));
        }
        if let Some(c) = finite(bar.close) {
            self.close = Some(c);
        }
        if bar.volume.is_finite() {
            self.volume += bar.volume;
        }
    }

    fn finish(self) -> Option<OhlcvBar> {
        Some(OhlcvBar {
            timestamp: self.start,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
            volume: self.volume,
        })
    }
}

/// Aggregate time-ordered bars into `width_secs` buckets:
/// open = first, high = max, low = min, close = last, volume = sum.
///
/// Missing (non-finite) inputs are skipped inside a bucket; a bucket left
/// without any of its four price aggregates is dropped.
pub fn resample(bars: &[OhlcvBar], width_secs: i64) -> Vec<OhlcvBar> {
    let mut out = Vec::new();
    let mut current: Option<Bucket> = None;

    for bar in bars {
        let start = bucket_start(bar.timestamp, width_secs);
        if let Some(bucket) = current.as_mut().filter(|b| b.start == start) {
            bucket.push(bar);
            continue;
        }
        if let Some(done) = current.take().and_then(Bucket::finish) {
            out.push(done);
        }
        let mut bucket = Bucket::new(start);
        bucket.push(bar);
        current = Some(bucket);
    }
    if let Some(done) = current.and_then(Bucket::finish) {
        out.push(done);
    }

    out
}

/// Four-hour bars from hourly bars.
pub fn resample_h4(hourly: &[OhlcvBar]) -> Vec<OhlcvBar> {
    resample(hourly, FOUR_HOURS_SECS)
}
