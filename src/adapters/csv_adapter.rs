//! CSV file market data adapter.
//!
//! Reads `<dir>/<symbol>_<interval>.csv`, e.g. `GC=F_1d.csv` and `GC=F_1h.csv`.
//! The header may use any column naming [`canonical_column`] understands.

use crate::domain::error::DataError;
use crate::domain::normalize::{canonical_column, Column};
use crate::ports::market_data_port::{Interval, MarketDataPort, RawColumn, RawFrame};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval.code()))
    }
}

impl MarketDataPort for CsvAdapter {
    fn name(&self) -> &str {
        "csv"
    }

    /// The lookback window is anchored at the newest row in the file, not at
    /// the wall clock, so archived files stay usable.
    fn get_bars(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: u32,
    ) -> Result<RawFrame, DataError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| DataError::Unavailable {
            symbol: symbol.to_string(),
            what: format!("{interval} ({}: {e})", path.display()),
        })?;

        let frame = parse_csv(&content)?;
        Ok(trim_to_lookback(frame, lookback_days))
    }
}

/// Parse CSV text into a [`RawFrame`]. Empty cells and `null`/`nan` become
/// missing values; anything else that is not a number is malformed.
pub fn parse_csv(content: &str) -> Result<RawFrame, DataError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| DataError::malformed(format!("CSV header error: {e}")))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(RawFrame::default());
    }

    let time_idx = headers
        .iter()
        .position(|h| canonical_column(h) == Some(Column::Timestamp))
        .ok_or_else(|| DataError::malformed("missing timestamp column"))?;

    let mut frame = RawFrame {
        timestamps: Vec::new(),
        columns: headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_idx)
            .map(|(_, name)| RawColumn {
                name: name.to_string(),
                values: Vec::new(),
            })
            .collect(),
    };

    for result in rdr.records() {
        let record = result.map_err(|e| DataError::malformed(format!("CSV parse error: {e}")))?;

        let raw_time = record
            .get(time_idx)
            .ok_or_else(|| DataError::malformed("missing timestamp value"))?;
        frame.timestamps.push(parse_timestamp(raw_time)?);

        let cells = record.iter().enumerate().filter(|(i, _)| *i != time_idx);
        for (column, (_, cell)) in frame.columns.iter_mut().zip(cells) {
            column.values.push(parse_value(cell, &column.name)?);
        }
    }

    Ok(frame)
}

fn parse_value(cell: &str, column: &str) -> Result<Option<f64>, DataError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("null") || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|e| DataError::malformed(format!("invalid {column} value '{cell}': {e}")))
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) and bare `YYYY-MM-DD`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DataError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| DataError::malformed(format!("invalid timestamp '{raw}'")))
}

fn trim_to_lookback(frame: RawFrame, lookback_days: u32) -> RawFrame {
    let Some(newest) = frame.timestamps.iter().max().copied() else {
        return frame;
    };
    let cutoff = newest - Duration::days(i64::from(lookback_days));
    let keep: Vec<bool> = frame.timestamps.iter().map(|t| *t >= cutoff).collect();

    let pick = |values: Vec<Option<f64>>| -> Vec<Option<f64>> {
        values
            .into_iter()
            .zip(&keep)
            .filter_map(|(v, k)| k.then_some(v))
            .collect()
    };

    RawFrame {
        timestamps: frame
            .timestamps
            .into_iter()
            .zip(&keep)
            .filter_map(|(t, k)| k.then_some(t))
            .collect(),
        columns: frame
            .columns
            .into_iter()
            .map(|c| RawColumn {
                name: c.name,
                values: pick(c.values),
            })
            .collect(),
    }
}
