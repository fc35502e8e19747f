//! ATR-based stop/target levels and fixed-fraction position sizing.

use std::fmt;

use crate::domain::error::SignalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Stop one ATR away from entry; target `reward_risk_ratio` ATRs the other way.
pub fn compute_levels(
    entry_price: f64,
    direction: Direction,
    atr: f64,
    reward_risk_ratio: f64,
) -> Result<RiskLevels, SignalError> {
    if !entry_price.is_finite() {
        return Err(SignalError::RiskInput {
            reason: format!("entry price must be finite, got {entry_price}"),
        });
    }
    if !(atr.is_finite() && atr > 0.0) {
        return Err(SignalError::RiskInput {
            reason: format!("atr must be positive, got {atr}"),
        });
    }
    if !(reward_risk_ratio.is_finite() && reward_risk_ratio > 0.0) {
        return Err(SignalError::RiskInput {
            reason: format!("reward/risk ratio must be positive, got {reward_risk_ratio}"),
        });
    }

    let sign = direction.sign();
    Ok(RiskLevels {
        stop_loss: entry_price - sign * atr,
        take_profit: entry_price + sign * atr * reward_risk_ratio,
    })
}

/// Units such that hitting the stop loses `risk_pct` percent of `balance`.
/// Zero when the stop distance is zero or inputs are non-positive.
pub fn position_size(balance: f64, risk_pct: f64, entry_price: f64, stop_loss: f64) -> f64 {
    let distance = (entry_price - stop_loss).abs();
    if balance <= 0.0 || risk_pct <= 0.0 || distance == 0.0 || !distance.is_finite() {
        return 0.0;
    }
    balance * risk_pct / 100.0 / distance
}
