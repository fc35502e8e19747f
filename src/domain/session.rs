//! Position tracking and session state.
//!
//! Single instrument, single slot: at most one open [`Position`] at a time.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::risk::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub quantity: f64,
    pub opened_at: DateTime<Utc>,
    /// Start of the newest hourly bar already seen at entry. Exits only
    /// consider bars after it.
    pub data_as_of: DateTime<Utc>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * self.quantity * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::TakeProfit => write!(f, "take profit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub position: Position,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub closed_at: DateTime<Utc>,
    pub pnl: f64,
}

/// Downstream execution mode. Does not influence decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradingMode {
    #[default]
    Demo,
    Live,
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingMode::Demo => write!(f, "DEMO"),
            TradingMode::Live => write!(f, "LIVE"),
        }
    }
}

/// Result of offering a position to the single slot.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Opened,
    SlotOccupied(Position),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub running: bool,
    pub mode: TradingMode,
    pub initial_balance: f64,
    pub balance: f64,
    positions: Vec<Position>,
    pub closed_trades: Vec<ClosedTrade>,
}

impl SessionState {
    pub fn new(initial_balance: f64, mode: TradingMode) -> Self {
        SessionState {
            running: false,
            mode,
            initial_balance,
            balance: initial_balance,
            positions: Vec::new(),
            closed_trades: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.positions.first()
    }

    pub fn has_open_position(&self) -> bool {
        !self.positions.is_empty()
    }

    /// Opens `position` only when no position is open.
    pub fn try_open(&mut self, position: Position) -> OpenOutcome {
        if let Some(existing) = self.positions.first() {
            return OpenOutcome::SlotOccupied(existing.clone());
        }
        self.positions.push(position);
        OpenOutcome::Opened
    }

    /// Close event: moves the open position into history and books its PnL.
    pub fn close_position(
        &mut self,
        exit_price: f64,
        exit_reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> Option<ClosedTrade> {
        if self.positions.is_empty() {
            return None;
        }
        let position = self.positions.remove(0);
        let pnl = position.unrealized_pnl(exit_price);
        self.balance += pnl;
        let trade = ClosedTrade {
            position,
            exit_price,
            exit_reason,
            closed_at,
            pnl,
        };
        self.closed_trades.push(trade.clone());
        Some(trade)
    }
}

/// Handle shared between the scheduler, the control surface and notifiers.
pub type SharedSession = Arc<Mutex<SessionState>>;

pub fn shared(state: SessionState) -> SharedSession {
    Arc::new(Mutex::new(state))
}

/// Lock the session, recovering the state if a holder panicked.
pub fn lock(session: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
