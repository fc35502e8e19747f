//! Stop-loss / take-profit checks for the open position.
//!
//! Intrabar: a bar closes the position when its range touches either level.
//! If both levels fall inside one bar the stop is assumed to have filled first.
//! Only bars that start after [`Position::data_as_of`] can trigger an exit.

use crate::domain::ohlcv::OhlcvBar;
use crate::domain::session::{ExitReason, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub reason: ExitReason,
    pub price: f64,
}

pub fn check_exit(position: &Position, bar: &OhlcvBar) -> Option<ExitSignal> {
    if !bar.is_complete() {
        return None;
    }

    let (stop_hit, target_hit) = if position.is_long() {
        (
            position.should_stop_loss(bar.low),
            position.should_take_profit(bar.high),
        )
    } else {
        (
            position.should_stop_loss(bar.high),
            position.should_take_profit(bar.low),
        )
    };

    if stop_hit {
        Some(ExitSignal {
            reason: ExitReason::StopLoss,
            price: position.stop_loss,
        })
    } else if target_hit {
        Some(ExitSignal {
            reason: ExitReason::TakeProfit,
            price: position.take_profit,
        })
    } else {
        None
    }
}

/// First exit among `bars` (oldest first) that started after the position's
/// entry data.
pub fn scan_exit(position: &Position, bars: &[OhlcvBar]) -> Option<ExitSignal> {
    bars.iter()
        .filter(|bar| bar.timestamp > position.data_as_of)
        .find_map(|bar| check_exit(position, bar))
}
