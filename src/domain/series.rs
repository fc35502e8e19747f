//! Indicator-annotated bar series and the two-timeframe market snapshot.

use std::collections::HashMap;
use std::fmt;

use crate::domain::indicator::{self, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    D1,
    H4,
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::D1 => write!(f, "D1"),
            Timeframe::H4 => write!(f, "H4"),
        }
    }
}

/// Bars of one timeframe plus indicator series aligned index-for-index with them.
#[derive(Debug, Clone)]
pub struct Series {
    pub timeframe: Timeframe,
    pub bars: Vec<OhlcvBar>,
    pub indicators: HashMap<IndicatorType, IndicatorSeries>,
}

impl Series {
    pub fn new(timeframe: Timeframe, bars: Vec<OhlcvBar>) -> Self {
        Series {
            timeframe,
            bars,
            indicators: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn attach(&mut self, indicator_type: IndicatorType) {
        let series = indicator::compute(&self.bars, indicator_type);
        self.indicators.insert(indicator_type, series);
    }

    pub fn attach_all(&mut self, indicator_types: &[IndicatorType]) {
        for &indicator_type in indicator_types {
            self.attach(indicator_type);
        }
    }

    /// Most recent bar; may still be forming.
    pub fn latest(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    /// Index of the last fully closed bar (second to last).
    pub fn last_closed_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(2)
    }

    pub fn value(&self, indicator_type: IndicatorType, index: usize) -> Option<&IndicatorValue> {
        self.indicators.get(&indicator_type)?.get(index)
    }

    pub fn simple(&self, indicator_type: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator_type)?.simple(index)
    }
}

/// The paired D1/H4 series used for one decision cycle.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub d1: Series,
    pub h4: Series,
    /// Hourly bars the H4 series was resampled from, oldest first.
    pub hourly: Vec<OhlcvBar>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::indicator::STANDARD_SET;

    #[test]
    fn attach_all_aligns_with_bars() {
        let mut series = Series::new(Timeframe::D1, make_bars(&[1.0, 2.0, 3.0, 4.0]));
        series.attach_all(&STANDARD_SET);

        assert_eq!(series.indicators.len(), STANDARD_SET.len());
        for ind in series.indicators.values() {
            assert_eq!(ind.values.len(), series.len());
        }
    }

    #[test]
    fn last_closed_index_skips_forming_bar() {
        let series = Series::new(Timeframe::H4, make_bars(&[1.0, 2.0, 3.0]));
        assert_eq!(series.last_closed_index(), Some(1));
        assert_eq!(series.latest().map(|b| b.close), Some(3.0));

        let short = Series::new(Timeframe::H4, make_bars(&[1.0]));
        assert_eq!(short.last_closed_index(), None);
    }

    #[test]
    fn value_lookup_requires_attached_indicator() {
        let mut series = Series::new(Timeframe::D1, make_bars(&[5.0, 6.0]));
        assert_eq!(series.simple(IndicatorType::Ema(50), 0), None);

        series.attach(IndicatorType::Ema(50));
        assert_eq!(series.simple(IndicatorType::Ema(50), 0), Some(5.0));
    }

    #[test]
    fn timeframe_display() {
        assert_eq!(Timeframe::D1.to_string(), "D1");
        assert_eq!(Timeframe::H4.to_string(), "H4");
    }
}
