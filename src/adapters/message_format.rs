//! Markdown rendering of cycle reports and control replies.

use crate::domain::control::{ControlReply, StatusView};
use crate::domain::cycle::{CycleOutcome, CycleReport};
use crate::domain::decision::Decision;
use crate::domain::risk::Direction;
use crate::domain::session::{ClosedTrade, Position, TradingMode};

const RULE: &str = "-------------------";

/// `1234567.891` → `$1,234,567.89`; negatives as `-$12.00`.
pub fn money(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// Escape Telegram legacy-Markdown control characters in free text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn technical(decision: &Decision) -> String {
    escape(&decision.technical_rationale.join(" "))
}

fn verdict_label(decision: &Decision) -> String {
    decision.verdict.to_string().replace('_', " ")
}

fn direction_icon(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "🟢",
        Direction::Short => "🔴",
    }
}

/// Message for one cycle, or `None` when there is nothing to say.
pub fn format_cycle(report: &CycleReport) -> Option<String> {
    let outcome = format_outcome(&report.outcome);
    let closed = report.closed.as_ref().map(format_closed);

    match (closed, outcome) {
        (None, None) => None,
        (Some(c), None) => Some(c),
        (None, Some(o)) => Some(o),
        (Some(c), Some(o)) => Some(format!("{c}\n\n{o}")),
    }
}

fn format_outcome(outcome: &CycleOutcome) -> Option<String> {
    let text = match outcome {
        CycleOutcome::Paused => return None,
        CycleOutcome::Failed(decision) => {
            format!("⚠️ Analysis error: {}", technical(decision))
        }
        CycleOutcome::Monitoring { decision, position } => format!(
            "ℹ️ Position already open ({} @ {}). Monitoring... Decision: {}.",
            position.direction,
            money(position.entry_price),
            verdict_label(decision)
        ),
        CycleOutcome::NoVolatility(decision) => format!(
            "⚠️ {} signal skipped: volatility (ATR) unavailable. ({})",
            verdict_label(decision),
            technical(decision)
        ),
        CycleOutcome::Opened { decision, position } => format!(
            "{} *NEW SIGNAL: {}*\n{RULE}\n*- Entry:* {}\n*- SL:* {}\n*- TP:* {}\n*- Size:* {:.4}\n\n*Technical:* {}\n*Fundamental:* {}",
            direction_icon(position.direction),
            position.direction,
            money(position.entry_price),
            money(position.stop_loss),
            money(position.take_profit),
            position.quantity,
            technical(decision),
            escape(&decision.fundamental_rationale)
        ),
        CycleOutcome::Held(decision) => {
            let score = decision
                .score()
                .map(|s| format!(" (score {s:+})"))
                .unwrap_or_default();
            format!(
                "✅ Analysis OK. Decision: {}{score}. ({})",
                verdict_label(decision),
                technical(decision)
            )
        }
    };
    Some(text)
}

fn format_closed(trade: &ClosedTrade) -> String {
    let icon = if trade.pnl >= 0.0 { "💰" } else { "🔻" };
    format!(
        "{icon} *POSITION CLOSED: {}*\n{RULE}\n*- Direction:* {}\n*- Entry:* {}\n*- Exit:* {}\n*- P/L:* {}",
        trade.exit_reason,
        trade.position.direction,
        money(trade.position.entry_price),
        money(trade.exit_price),
        money(trade.pnl)
    )
}

fn format_position(position: &Position) -> String {
    format!(
        "🔍 *OPEN POSITION*\n{RULE}\n*- Direction:* {}\n*- Entry:* {}\n*- Stop Loss:* {}\n*- Take Profit:* {}\n*- Size:* {:.4}\n*- Opened:* {}",
        position.direction,
        money(position.entry_price),
        money(position.stop_loss),
        money(position.take_profit),
        position.quantity,
        position.opened_at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn format_status(view: &StatusView) -> String {
    let state = if view.running { "🟢 RUNNING" } else { "🔴 STOPPED" };
    let position = view
        .open_position
        .as_ref()
        .map(|p| format!("*{}* @ {}", p.direction, money(p.entry_price)))
        .unwrap_or_else(|| "None".to_string());
    format!(
        "*SYSTEM STATUS*\n{RULE}\n*- State:* {state}\n*- Mode:* {}\n*- Balance:* {}\n*- Open position:* {position}\n*- Closed trades:* {}",
        view.mode,
        money(view.balance),
        view.closed_trades
    )
}

pub fn format_reply(reply: &ControlReply) -> String {
    match reply {
        ControlReply::Started => "✅ Bot started. Periodic analysis enabled.".to_string(),
        ControlReply::AlreadyRunning => "ℹ️ Bot is already running.".to_string(),
        ControlReply::Stopped => "🛑 Bot stopped.".to_string(),
        ControlReply::AlreadyStopped => "ℹ️ Bot is already stopped.".to_string(),
        ControlReply::Status(view) => format_status(view),
        ControlReply::ModeChanged(TradingMode::Demo) => "🎮 *DEMO* mode enabled.".to_string(),
        ControlReply::ModeChanged(TradingMode::Live) => {
            "⚠️ *LIVE* mode enabled. Proceed with caution.".to_string()
        }
        ControlReply::Balance { balance, initial } => format!(
            "💰 Current balance: *{}* (started at {})",
            money(*balance),
            money(*initial)
        ),
        ControlReply::Positions(positions) if positions.is_empty() => {
            "No open positions.".to_string()
        }
        ControlReply::Positions(positions) => positions
            .iter()
            .map(format_position)
            .collect::<Vec<_>>()
            .join("\n\n"),
        ControlReply::AnalyzeRequested => "🔎 Running analysis...".to_string(),
    }
}
