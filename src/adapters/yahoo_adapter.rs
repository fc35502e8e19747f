//! Yahoo Finance v8 chart API market data adapter.
//!
//! No retries: a failed request fails the cycle and the next scheduled cycle
//! tries again.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

use crate::domain::error::DataError;
use crate::ports::market_data_port::{Interval, MarketDataPort, RawFrame};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) goldsignal";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DataError::unreachable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, interval: Interval, lookback_days: u32) -> String {
        format!(
            "{}/{symbol}?range={lookback_days}d&interval={}",
            self.base_url,
            interval.code()
        )
    }
}

impl MarketDataPort for YahooAdapter {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn get_bars(
        &self,
        symbol: &str,
        interval: Interval,
        lookback_days: u32,
    ) -> Result<RawFrame, DataError> {
        let url = self.chart_url(symbol, interval, lookback_days);
        debug!(%url, "requesting chart");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DataError::unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| DataError::unreachable(e.to_string()))?;

        // Yahoo reports unknown symbols as 404 with a JSON error body.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::unreachable(format!("HTTP {status}")));
        }
        parse_chart(symbol, interval, &body)
    }
}

/// Parse a chart API body into a columnar frame.
pub fn parse_chart(symbol: &str, interval: Interval, body: &str) -> Result<RawFrame, DataError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DataError::malformed(format!("chart JSON: {e}")))?;

    let unavailable = || DataError::Unavailable {
        symbol: symbol.to_string(),
        what: interval.to_string(),
    };

    let Some(results) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Err(unavailable()),
            Some(err) => Err(DataError::malformed(format!(
                "{}: {}",
                err.code, err.description
            ))),
            None => Err(DataError::malformed("empty result with no error")),
        };
    };

    let data = results.into_iter().next().ok_or_else(unavailable)?;
    let Some(raw_timestamps) = data.timestamp else {
        return Err(unavailable());
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::malformed("no quote data"))?;

    let timestamps = raw_timestamps
        .iter()
        .map(|&ts| {
            DateTime::from_timestamp(ts, 0)
                .ok_or_else(|| DataError::malformed(format!("invalid timestamp: {ts}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawFrame {
        timestamps,
        columns: Vec::new(),
    }
    .with_column("open", quote.open)
    .with_column("high", quote.high)
    .with_column("low", quote.low)
    .with_column("close", quote.close)
    .with_column("volume", quote.volume))
}
