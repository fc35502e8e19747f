//! Chat control commands and their effect on the session.

use std::fmt;

use tracing::info;

use crate::domain::session::{Position, SessionState, TradingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Status,
    Demo,
    Live,
    Balance,
    Positions,
    Analyze,
}

impl ControlCommand {
    /// Parse the first word of a chat message. `/status@my_bot` is accepted;
    /// plain text and unknown commands yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(ControlCommand::Start),
            "stop" => Some(ControlCommand::Stop),
            "status" => Some(ControlCommand::Status),
            "demo" => Some(ControlCommand::Demo),
            "real" | "live" => Some(ControlCommand::Live),
            "balance" => Some(ControlCommand::Balance),
            "positions" => Some(ControlCommand::Positions),
            "analyze" => Some(ControlCommand::Analyze),
            _ => None,
        }
    }

    /// Apply the command to the session. `Analyze` does not touch state; the
    /// caller runs a cycle when it sees [`ControlReply::AnalyzeRequested`].
    pub fn apply(self, session: &mut SessionState) -> ControlReply {
        let reply = match self {
            ControlCommand::Start if session.running => ControlReply::AlreadyRunning,
            ControlCommand::Start => {
                session.start();
                ControlReply::Started
            }
            ControlCommand::Stop if !session.running => ControlReply::AlreadyStopped,
            ControlCommand::Stop => {
                session.stop();
                ControlReply::Stopped
            }
            ControlCommand::Status => ControlReply::Status(StatusView::of(session)),
            ControlCommand::Demo => {
                session.mode = TradingMode::Demo;
                ControlReply::ModeChanged(TradingMode::Demo)
            }
            ControlCommand::Live => {
                session.mode = TradingMode::Live;
                ControlReply::ModeChanged(TradingMode::Live)
            }
            ControlCommand::Balance => ControlReply::Balance {
                balance: session.balance,
                initial: session.initial_balance,
            },
            ControlCommand::Positions => {
                ControlReply::Positions(session.positions().to_vec())
            }
            ControlCommand::Analyze => ControlReply::AnalyzeRequested,
        };
        info!(command = %self, running = session.running, mode = %session.mode, "control command applied");
        reply
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCommand::Start => "/start",
            ControlCommand::Stop => "/stop",
            ControlCommand::Status => "/status",
            ControlCommand::Demo => "/demo",
            ControlCommand::Live => "/real",
            ControlCommand::Balance => "/balance",
            ControlCommand::Positions => "/positions",
            ControlCommand::Analyze => "/analyze",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub running: bool,
    pub mode: TradingMode,
    pub balance: f64,
    pub open_position: Option<Position>,
    pub closed_trades: usize,
}

impl StatusView {
    pub fn of(session: &SessionState) -> Self {
        StatusView {
            running: session.running,
            mode: session.mode,
            balance: session.balance,
            open_position: session.open_position().cloned(),
            closed_trades: session.closed_trades.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlReply {
    Started,
    AlreadyRunning,
    Stopped,
    AlreadyStopped,
    Status(StatusView),
    ModeChanged(TradingMode),
    Balance { balance: f64, initial: f64 },
    Positions(Vec<Position>),
    AnalyzeRequested,
}
