//! Market data adapter: provider frames → indicator-annotated snapshot.
//!
//! Fails closed: every provider or shape failure comes back as a [`DataError`]
//! and nothing is retried here. The next scheduled cycle is the retry.

use tracing::{debug, warn};

use crate::domain::error::DataError;
use crate::domain::indicator::{IndicatorType, STANDARD_SET};
use crate::domain::normalize::normalize_frame;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::resample::resample_h4;
use crate::domain::series::{MarketSnapshot, Series, Timeframe};
use crate::ports::market_data_port::{Interval, MarketDataPort};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub daily_lookback_days: u32,
    pub hourly_lookback_days: u32,
    pub indicators: Vec<IndicatorType>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            daily_lookback_days: 365,
            hourly_lookback_days: 60,
            indicators: STANDARD_SET.to_vec(),
        }
    }
}

pub struct MarketDataService {
    provider: Box<dyn MarketDataPort>,
    settings: FetchSettings,
}

impl MarketDataService {
    pub fn new(provider: Box<dyn MarketDataPort>, settings: FetchSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch daily and hourly bars, resample hourly into H4 and attach the
    /// configured indicators to both timeframes.
    pub fn fetch(&self, symbol: &str) -> Result<MarketSnapshot, DataError> {
        let daily = self.load(symbol, Interval::Daily, self.settings.daily_lookback_days)?;
        let hourly = self.load(symbol, Interval::Hourly, self.settings.hourly_lookback_days)?;

        let d1_bars: Vec<OhlcvBar> = daily.into_iter().filter(OhlcvBar::is_complete).collect();
        let h4_bars = resample_h4(&hourly);

        if d1_bars.is_empty() {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
                what: "daily".into(),
            });
        }
        if h4_bars.is_empty() {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
                what: "4-hour".into(),
            });
        }

        let mut d1 = Series::new(Timeframe::D1, d1_bars);
        let mut h4 = Series::new(Timeframe::H4, h4_bars);
        d1.attach_all(&self.settings.indicators);
        h4.attach_all(&self.settings.indicators);

        debug!(symbol, d1_bars = d1.len(), h4_bars = h4.len(), "snapshot built");
        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            d1,
            h4,
            hourly,
        })
    }

    fn load(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: u32,
    ) -> Result<Vec<OhlcvBar>, DataError> {
        let frame = self
            .provider
            .get_bars(symbol, interval, lookback_days)
            .inspect_err(|e| {
                warn!(provider = self.provider.name(), symbol, %interval, error = %e, "fetch failed")
            })?;
        normalize_frame(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::market_data_port::RawFrame;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashMap;

    struct StubProvider {
        frames: HashMap<Interval, Result<RawFrame, DataError>>,
    }

    impl MarketDataPort for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn get_bars(
            &self,
            _symbol: &str,
            interval: Interval,
            _lookback_days: u32,
        ) -> Result<RawFrame, DataError> {
            self.frames
                .get(&interval)
                .cloned()
                .unwrap_or_else(|| Ok(RawFrame::default()))
        }
    }

    fn frame(start: DateTime<Utc>, step: Duration, closes: &[f64]) -> RawFrame {
        let timestamps = (0..closes.len()).map(|i| start + step * i as i32).collect();
        let col = |offset: f64| closes.iter().map(|c| Some(c + offset)).collect();
        RawFrame {
            timestamps,
            columns: Vec::new(),
        }
        .with_column("Open", col(0.0))
        .with_column("High", col(1.0))
        .with_column("Low", col(-1.0))
        .with_column("Close", col(0.0))
        .with_column("Volume", closes.iter().map(|_| Some(100.0)).collect())
    }

    fn service(daily: Result<RawFrame, DataError>, hourly: Result<RawFrame, DataError>) -> MarketDataService {
        let frames = HashMap::from([(Interval::Daily, daily), (Interval::Hourly, hourly)]);
        MarketDataService::new(Box::new(StubProvider { frames }), FetchSettings::default())
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn builds_snapshot_with_indicators() {
        let daily = frame(start(), Duration::days(1), &[2000.0, 2010.0, 2020.0]);
        let hourly = frame(start(), Duration::hours(1), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let snapshot = service(Ok(daily), Ok(hourly)).fetch("GC=F").unwrap();

        assert_eq!(snapshot.symbol, "GC=F");
        assert_eq!(snapshot.d1.len(), 3);
        assert_eq!(snapshot.h4.len(), 2);
        assert_eq!(snapshot.h4.bars[0].close, 4.0);
        for indicator_type in STANDARD_SET {
            assert!(snapshot.d1.indicators.contains_key(&indicator_type));
            assert!(snapshot.h4.indicators.contains_key(&indicator_type));
        }
    }

    #[test]
    fn empty_daily_is_unavailable() {
        let hourly = frame(start(), Duration::hours(1), &[1.0, 2.0]);
        let err = service(Ok(RawFrame::default()), Ok(hourly))
            .fetch("GC=F")
            .unwrap_err();
        assert_eq!(
            err,
            DataError::Unavailable {
                symbol: "GC=F".into(),
                what: "daily".into()
            }
        );
    }

    #[test]
    fn empty_hourly_is_unavailable() {
        let daily = frame(start(), Duration::days(1), &[1.0, 2.0]);
        let err = service(Ok(daily), Ok(RawFrame::default()))
            .fetch("GC=F")
            .unwrap_err();
        assert!(matches!(err, DataError::Unavailable { what, .. } if what == "4-hour"));
    }

    #[test]
    fn provider_failure_propagates() {
        let daily = frame(start(), Duration::days(1), &[1.0, 2.0]);
        let err = service(Ok(daily), Err(DataError::unreachable("HTTP 502")))
            .fetch("GC=F")
            .unwrap_err();
        assert_eq!(err, DataError::unreachable("HTTP 502"));
    }

    #[test]
    fn missing_column_is_malformed() {
        let mut daily = frame(start(), Duration::days(1), &[1.0, 2.0]);
        daily.columns.retain(|c| c.name != "Close");
        let hourly = frame(start(), Duration::hours(1), &[1.0, 2.0]);
        let err = service(Ok(daily), Ok(hourly)).fetch("GC=F").unwrap_err();
        assert!(matches!(err, DataError::Malformed { .. }));
    }

    #[test]
    fn incomplete_daily_rows_are_dropped() {
        let mut daily = frame(start(), Duration::days(1), &[1.0, 2.0, 3.0]);
        daily.columns[3].values[1] = None;
        let hourly = frame(start(), Duration::hours(1), &[1.0]);
        let snapshot = service(Ok(daily), Ok(hourly)).fetch("GC=F").unwrap();
        let closes: Vec<f64> = snapshot.d1.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 3.0]);
    }
}
