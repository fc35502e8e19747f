//! One decision cycle: fetch, monitor the open position, decide, maybe open.
//!
//! The session lock is never held across provider calls. The slot check and
//! the insertion of a new position happen under a single acquisition.

use std::sync::{Mutex, TryLockError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::decision::{Decision, DecisionEngine, Verdict, DATA_UNAVAILABLE};
use crate::domain::market_data::MarketDataService;
use crate::domain::monitor::scan_exit;
use crate::domain::risk::{compute_levels, position_size};
use crate::domain::series::MarketSnapshot;
use crate::domain::session::{self, ClosedTrade, OpenOutcome, Position, SharedSession};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSettings {
    pub reward_risk_ratio: f64,
    pub risk_per_trade_pct: f64,
}

impl Default for RiskSettings {
    fn default() -> Self {
        RiskSettings {
            reward_risk_ratio: 2.0,
            risk_per_trade_pct: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Session stopped; nothing fetched.
    Paused,
    /// ERROR decision: data unavailable or indicators undefined.
    Failed(Decision),
    /// Non-error decision while the slot is occupied.
    Monitoring { decision: Decision, position: Position },
    /// Directional decision without a usable ATR.
    NoVolatility(Decision),
    Opened { decision: Decision, position: Position },
    Held(Decision),
}

impl CycleOutcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            CycleOutcome::Paused => None,
            CycleOutcome::Failed(d) | CycleOutcome::NoVolatility(d) | CycleOutcome::Held(d) => {
                Some(d)
            }
            CycleOutcome::Monitoring { decision, .. } | CycleOutcome::Opened { decision, .. } => {
                Some(decision)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub symbol: String,
    pub at: DateTime<Utc>,
    pub closed: Option<ClosedTrade>,
    pub outcome: CycleOutcome,
}

pub struct CycleRunner {
    symbol: String,
    market: MarketDataService,
    engine: DecisionEngine,
    risk: RiskSettings,
    session: SharedSession,
    in_flight: Mutex<()>,
}

impl CycleRunner {
    pub fn new(
        symbol: impl Into<String>,
        market: MarketDataService,
        engine: DecisionEngine,
        risk: RiskSettings,
        session: SharedSession,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            market,
            engine,
            risk,
            session,
            in_flight: Mutex::new(()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Scheduled cycle. Returns `None` when another cycle is still running.
    pub fn run_cycle(&self, now: DateTime<Utc>) -> Option<CycleReport> {
        self.run(now, true)
    }

    /// Manual trigger: runs even when the session is stopped.
    pub fn analyze(&self, now: DateTime<Utc>) -> Option<CycleReport> {
        self.run(now, false)
    }

    fn run(&self, now: DateTime<Utc>, require_running: bool) -> Option<CycleReport> {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!(symbol = %self.symbol, "previous cycle still running, skipping");
                return None;
            }
        };

        if require_running && !session::lock(&self.session).running {
            return Some(self.report(now, None, CycleOutcome::Paused));
        }

        let snapshot = match self.market.fetch(&self.symbol) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let decision = Decision::error(format!("{DATA_UNAVAILABLE}: {e}"));
                return Some(self.report(now, None, CycleOutcome::Failed(decision)));
            }
        };

        let closed = self.monitor(&snapshot, now);
        let decision = self.engine.decide(&snapshot);
        let data_as_of = snapshot.hourly.last().map_or(now, |bar| bar.timestamp);
        let outcome = self.act(decision, data_as_of, now);
        Some(self.report(now, closed, outcome))
    }

    fn monitor(&self, snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Option<ClosedTrade> {
        let mut state = session::lock(&self.session);
        let exit = scan_exit(state.open_position()?, &snapshot.hourly)?;
        let trade = state.close_position(exit.price, exit.reason, now)?;
        info!(
            symbol = %self.symbol,
            reason = %trade.exit_reason,
            exit_price = trade.exit_price,
            pnl = trade.pnl,
            balance = state.balance,
            "position closed"
        );
        Some(trade)
    }

    fn act(
        &self,
        decision: Decision,
        data_as_of: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> CycleOutcome {
        if decision.verdict == Verdict::Error {
            return CycleOutcome::Failed(decision);
        }

        let mut state = session::lock(&self.session);
        if let Some(existing) = state.open_position() {
            let position = existing.clone();
            return CycleOutcome::Monitoring { decision, position };
        }
        let Some(direction) = decision.verdict.direction() else {
            return CycleOutcome::Held(decision);
        };

        let (Some(entry), Some(atr)) = (decision.reference_price, decision.reference_volatility)
        else {
            return CycleOutcome::NoVolatility(decision);
        };
        if !(atr.is_finite() && atr > 0.0) {
            return CycleOutcome::NoVolatility(decision);
        }

        let levels = match compute_levels(entry, direction, atr, self.risk.reward_risk_ratio) {
            Ok(levels) => levels,
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "risk levels rejected");
                return CycleOutcome::NoVolatility(decision);
            }
        };
        let quantity = position_size(
            state.balance,
            self.risk.risk_per_trade_pct,
            entry,
            levels.stop_loss,
        );
        let position = Position {
            direction,
            entry_price: entry,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            quantity,
            opened_at: now,
            data_as_of,
        };

        match state.try_open(position.clone()) {
            OpenOutcome::Opened => {
                info!(
                    symbol = %self.symbol,
                    %direction,
                    entry,
                    stop_loss = levels.stop_loss,
                    take_profit = levels.take_profit,
                    quantity,
                    "position opened"
                );
                CycleOutcome::Opened { decision, position }
            }
            OpenOutcome::SlotOccupied(position) => CycleOutcome::Monitoring { decision, position },
        }
    }

    fn report(
        &self,
        at: DateTime<Utc>,
        closed: Option<ClosedTrade>,
        outcome: CycleOutcome,
    ) -> CycleReport {
        CycleReport {
            symbol: self.symbol.clone(),
            at,
            closed,
            outcome,
        }
    }
}
