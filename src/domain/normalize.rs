//! Provider payload normalization.
//!
//! Maps provider column names onto the fixed internal OHLCV naming and turns a
//! columnar [`RawFrame`] into strictly time-ordered bars.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::error::DataError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::market_data_port::RawFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }
}

/// Canonical column for a provider column name, or `None` for columns the
/// core does not use (`adjclose`, `dividends`, ...).
///
/// Accepts any case, surrounding whitespace, `_`/`-`/space separators and
/// numbered prefixes such as `"1. open"`.
pub fn canonical_column(name: &str) -> Option<Column> {
    let lowered = name.trim().to_lowercase();
    let unnumbered = match lowered.split_once(". ") {
        Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => lowered.as_str(),
    };
    let key: String = unnumbered
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect();

    match key.as_str() {
        "timestamp" | "datetime" | "date" | "time" | "t" => Some(Column::Timestamp),
        "open" | "o" => Some(Column::Open),
        "high" | "h" => Some(Column::High),
        "low" | "l" => Some(Column::Low),
        "close" | "c" => Some(Column::Close),
        "volume" | "vol" | "v" => Some(Column::Volume),
        _ => None,
    }
}

/// Convert a provider frame into bars.
///
/// - a frame without rows is an empty payload and yields no bars, whatever
///   its columns; the caller reports it as unavailable;
/// - every OHLCV column must be present exactly once and match the timestamp count;
/// - rows with every value missing are dropped, other gaps are kept as NaN
///   (missing volume as 0) for the caller to filter or aggregate;
/// - duplicate timestamps keep the last row; output is strictly increasing.
pub fn normalize_frame(frame: &RawFrame) -> Result<Vec<OhlcvBar>, DataError> {
    if frame.timestamps.is_empty() {
        return Ok(Vec::new());
    }

    let mut slots: [Option<&Vec<Option<f64>>>; 5] = [None; 5];

    for column in &frame.columns {
        let slot = match canonical_column(&column.name) {
            Some(Column::Open) => 0,
            Some(Column::High) => 1,
            Some(Column::Low) => 2,
            Some(Column::Close) => 3,
            Some(Column::Volume) => 4,
            Some(Column::Timestamp) | None => continue,
        };
        if slots[slot].is_some() {
            return Err(DataError::malformed(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if column.values.len() != frame.timestamps.len() {
            return Err(DataError::malformed(format!(
                "column '{}' has {} values for {} timestamps",
                column.name,
                column.values.len(),
                frame.timestamps.len()
            )));
        }
        slots[slot] = Some(&column.values);
    }

    let required = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];
    let mut columns: Vec<&Vec<Option<f64>>> = Vec::with_capacity(5);
    for (slot, column) in slots.iter().zip(required) {
        match *slot {
            Some(values) => columns.push(values),
            None => {
                return Err(DataError::malformed(format!(
                    "missing {} column",
                    column.name()
                )));
            }
        }
    }

    let mut by_time: BTreeMap<DateTime<Utc>, OhlcvBar> = BTreeMap::new();
    for (i, &timestamp) in frame.timestamps.iter().enumerate() {
        let row: Vec<Option<f64>> = columns.iter().map(|c| c[i]).collect();
        if row.iter().all(Option::is_none) {
            continue;
        }
        by_time.insert(
            timestamp,
            OhlcvBar {
                timestamp,
                open: row[0].unwrap_or(f64::NAN),
                high: row[1].unwrap_or(f64::NAN),
                low: row[2].unwrap_or(f64::NAN),
                close: row[3].unwrap_or(f64::NAN),
                volume: row[4].unwrap_or(0.0),
            },
        );
    }

    Ok(by_time.into_values().collect())
}
