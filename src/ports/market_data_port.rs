//! Market data provider port.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::domain::error::DataError;

/// Granularity requested from a provider. Four-hour bars are resampled from
/// hourly data, never requested directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
    Hourly,
}

impl Interval {
    pub fn code(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::Hourly => "1h",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One named value column as delivered by a provider. Names are not
/// normalized: `Close`, `close`, `4. close` and `c` all occur in the wild.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Columnar provider payload, one row per timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<RawColumn>,
}

impl RawFrame {
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn with_column(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.columns.push(RawColumn {
            name: name.to_string(),
            values,
        });
        self
    }
}

pub trait MarketDataPort: Send + Sync {
    fn name(&self) -> &str;

    fn get_bars(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: u32,
    ) -> Result<RawFrame, DataError>;
}
