//! Decision engine: four unweighted rules summed into a verdict.
//!
//! | rule           | input                                     | contribution |
//! |----------------|-------------------------------------------|--------------|
//! | trend          | D1 close vs EMA(50), last closed bar      | ±1           |
//! | momentum       | H4 MACD line vs signal, last closed bar   | ±1           |
//! | mean reversion | latest close vs H4 Bollinger bands        | -1, 0, +1    |
//! | sentiment      | news label                                | -1, 0, +1    |
//!
//! Total ≥ +2 opens long, ≤ -2 opens short, anything else holds.

use std::fmt;

use tracing::info;

use crate::domain::indicator::{atr, bollinger, macd, IndicatorType, IndicatorValue};
use crate::domain::risk::Direction;
use crate::domain::sentiment::{SentimentReading, SentimentScorer};
use crate::domain::series::MarketSnapshot;

pub const TREND_EMA: IndicatorType = IndicatorType::Ema(50);
pub const MOMENTUM_MACD: IndicatorType = IndicatorType::Macd {
    fast: macd::DEFAULT_FAST,
    slow: macd::DEFAULT_SLOW,
    signal: macd::DEFAULT_SIGNAL,
};
pub const REVERSION_BANDS: IndicatorType = IndicatorType::Bollinger {
    period: bollinger::DEFAULT_PERIOD,
    stddev_mult_x100: bollinger::DEFAULT_MULT_X100,
};
pub const VOLATILITY_ATR: IndicatorType = IndicatorType::Atr(atr::DEFAULT_PERIOD);

pub const OPEN_THRESHOLD: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    OpenLong,
    OpenShort,
    Hold,
    Error,
}

impl Verdict {
    pub fn from_score(score: i32) -> Self {
        if score >= OPEN_THRESHOLD {
            Verdict::OpenLong
        } else if score <= -OPEN_THRESHOLD {
            Verdict::OpenShort
        } else {
            Verdict::Hold
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Verdict::OpenLong => Some(Direction::Long),
            Verdict::OpenShort => Some(Direction::Short),
            Verdict::Hold | Verdict::Error => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::OpenLong => write!(f, "OPEN_LONG"),
            Verdict::OpenShort => write!(f, "OPEN_SHORT"),
            Verdict::Hold => write!(f, "HOLD"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// Per-rule contributions, kept for display and auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub trend: i32,
    pub momentum: i32,
    pub mean_reversion: i32,
    pub sentiment: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.trend + self.momentum + self.mean_reversion + self.sentiment
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub technical_rationale: Vec<String>,
    pub fundamental_rationale: String,
    pub reference_price: Option<f64>,
    pub reference_volatility: Option<f64>,
    pub breakdown: Option<ScoreBreakdown>,
}

impl Decision {
    /// An ERROR decision. Carries no reference price or volatility.
    pub fn error(cause: impl Into<String>) -> Self {
        Decision {
            verdict: Verdict::Error,
            technical_rationale: vec![cause.into()],
            fundamental_rationale: "N/A".to_string(),
            reference_price: None,
            reference_volatility: None,
            breakdown: None,
        }
    }

    pub fn score(&self) -> Option<i32> {
        self.breakdown.map(|b| b.total())
    }

    pub fn is_directional(&self) -> bool {
        self.verdict.direction().is_some()
    }
}

pub const DATA_UNAVAILABLE: &str = "data unavailable";

/// Pure rule evaluation over a snapshot and an already-scored sentiment.
pub fn evaluate(snapshot: &MarketSnapshot, sentiment: &SentimentReading) -> Decision {
    let d1 = &snapshot.d1;
    let h4 = &snapshot.h4;

    let Some(current) = d1.latest() else {
        return Decision::error(DATA_UNAVAILABLE);
    };
    let (Some(d1_idx), Some(h4_idx)) = (d1.last_closed_index(), h4.last_closed_index()) else {
        return Decision::error(format!(
            "{DATA_UNAVAILABLE}: need two bars per timeframe (D1 {}, H4 {})",
            d1.len(),
            h4.len()
        ));
    };

    let d1_close = d1.bars[d1_idx].close;
    let Some(ema) = d1.simple(TREND_EMA, d1_idx) else {
        return Decision::error(format!("{DATA_UNAVAILABLE}: D1 {TREND_EMA} undefined"));
    };
    let Some(&IndicatorValue::Macd { line, signal, .. }) = h4.value(MOMENTUM_MACD, h4_idx) else {
        return Decision::error(format!("{DATA_UNAVAILABLE}: H4 {MOMENTUM_MACD} undefined"));
    };

    let mut breakdown = ScoreBreakdown::default();
    let mut rationale = Vec::with_capacity(4);

    if d1_close > ema {
        breakdown.trend = 1;
        rationale.push("Trend D1 LONG.".to_string());
    } else {
        breakdown.trend = -1;
        rationale.push("Trend D1 SHORT.".to_string());
    }

    if line > signal {
        breakdown.momentum = 1;
        rationale.push("MACD H4 LONG.".to_string());
    } else {
        breakdown.momentum = -1;
        rationale.push("MACD H4 SHORT.".to_string());
    }

    if let Some(&IndicatorValue::Bollinger { upper, lower, .. }) = h4.value(REVERSION_BANDS, h4_idx)
    {
        if current.close < lower {
            breakdown.mean_reversion += 1;
            rationale.push("Price below lower Bollinger Band (LONG signal).".to_string());
        }
        if current.close > upper {
            breakdown.mean_reversion -= 1;
            rationale.push("Price above upper Bollinger Band (SHORT signal).".to_string());
        }
    }

    breakdown.sentiment = sentiment.label.weight();

    Decision {
        verdict: Verdict::from_score(breakdown.total()),
        technical_rationale: rationale,
        fundamental_rationale: sentiment.describe(),
        reference_price: Some(current.close),
        reference_volatility: d1.simple(VOLATILITY_ATR, d1.len() - 1),
        breakdown: Some(breakdown),
    }
}

pub struct DecisionEngine {
    sentiment: SentimentScorer,
}

impl DecisionEngine {
    pub fn new(sentiment: SentimentScorer) -> Self {
        Self { sentiment }
    }

    /// Score sentiment and evaluate the rules. An empty D1 series short-circuits
    /// to ERROR without consulting the news provider.
    pub fn decide(&self, snapshot: &MarketSnapshot) -> Decision {
        if snapshot.d1.is_empty() {
            return Decision::error(DATA_UNAVAILABLE);
        }
        let sentiment = self.sentiment.score_sentiment();
        let decision = evaluate(snapshot, &sentiment);
        info!(
            symbol = %snapshot.symbol,
            verdict = %decision.verdict,
            score = ?decision.score(),
            sentiment = %sentiment.label,
            "decision evaluated"
        );
        decision
    }
}
