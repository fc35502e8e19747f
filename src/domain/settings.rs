//! Typed, validated runtime settings read through [`ConfigPort`].

use std::fmt;
use std::path::PathBuf;

use crate::domain::cycle::RiskSettings;
use crate::domain::error::SignalError;
use crate::domain::market_data::FetchSettings;
use crate::domain::sentiment::{DEFAULT_QUERY, MAX_HEADLINES};
use crate::domain::session::TradingMode;
use crate::ports::config_port::ConfigPort;
use crate::ports::news_port::NewsQuery;

pub const NEWS_API_KEY_ENV: &str = "NEWS_API_KEY";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Csv { dir: PathBuf },
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Yahoo => write!(f, "yahoo"),
            ProviderKind::Csv { dir } => write!(f, "csv ({})", dir.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSettings {
    pub symbol: String,
    pub provider: ProviderKind,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsSettings {
    /// `None` when news is disabled or no API key is configured.
    pub api_key: Option<String>,
    pub query: NewsQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub initial_balance: f64,
    pub mode: TradingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub interval_secs: u64,
    pub first_delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub market: MarketSettings,
    pub news: NewsSettings,
    pub risk: RiskSettings,
    pub session: SessionSettings,
    pub schedule: ScheduleSettings,
    pub telegram: Option<TelegramSettings>,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalError> {
        Ok(Settings {
            market: build_market(config)?,
            news: build_news(config)?,
            risk: build_risk(config)?,
            session: build_session(config)?,
            schedule: build_schedule(config)?,
            telegram: build_telegram(config)?,
        })
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SignalError {
    SignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_days(config: &dyn ConfigPort, key: &str, default: i64) -> Result<u32, SignalError> {
    let value = config.get_int("market", key, default);
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid("market", key, format!("{key} must be a positive day count")))
}

fn build_market(config: &dyn ConfigPort) -> Result<MarketSettings, SignalError> {
    let symbol = non_blank(config, "market", "symbol").unwrap_or_else(|| "GC=F".to_string());

    let provider = match non_blank(config, "market", "provider")
        .unwrap_or_else(|| "yahoo".to_string())
        .to_lowercase()
        .as_str()
    {
        "yahoo" => ProviderKind::Yahoo,
        "csv" => {
            let dir = non_blank(config, "market", "csv_dir").ok_or_else(|| {
                SignalError::ConfigMissing {
                    section: "market".into(),
                    key: "csv_dir".into(),
                }
            })?;
            ProviderKind::Csv {
                dir: PathBuf::from(dir),
            }
        }
        other => {
            return Err(invalid(
                "market",
                "provider",
                format!("unknown provider '{other}' (expected yahoo or csv)"),
            ));
        }
    };

    let fetch = FetchSettings {
        daily_lookback_days: positive_days(config, "daily_lookback_days", 365)?,
        hourly_lookback_days: positive_days(config, "hourly_lookback_days", 60)?,
        ..FetchSettings::default()
    };

    Ok(MarketSettings {
        symbol,
        provider,
        fetch,
    })
}

fn build_news(config: &dyn ConfigPort) -> Result<NewsSettings, SignalError> {
    let page_size = config.get_int("news", "page_size", MAX_HEADLINES as i64);
    if !(1..=100).contains(&page_size) {
        return Err(invalid("news", "page_size", "page_size must be between 1 and 100"));
    }

    let api_key = if config.get_bool("news", "enabled", true) {
        config.get_secret("news", "api_key", NEWS_API_KEY_ENV)
    } else {
        None
    };

    Ok(NewsSettings {
        api_key,
        query: NewsQuery {
            query: non_blank(config, "news", "query").unwrap_or_else(|| DEFAULT_QUERY.to_string()),
            language: non_blank(config, "news", "language").unwrap_or_else(|| "en".to_string()),
            sort_by: "publishedAt".to_string(),
            limit: page_size as usize,
        },
    })
}

fn build_risk(config: &dyn ConfigPort) -> Result<RiskSettings, SignalError> {
    let defaults = RiskSettings::default();

    let reward_risk_ratio = config.get_double("risk", "reward_risk_ratio", defaults.reward_risk_ratio);
    if !(reward_risk_ratio.is_finite() && reward_risk_ratio > 0.0) {
        return Err(invalid("risk", "reward_risk_ratio", "reward_risk_ratio must be positive"));
    }

    let risk_per_trade_pct =
        config.get_double("risk", "risk_per_trade_pct", defaults.risk_per_trade_pct);
    if !(risk_per_trade_pct > 0.0 && risk_per_trade_pct <= 100.0) {
        return Err(invalid(
            "risk",
            "risk_per_trade_pct",
            "risk_per_trade_pct must be in (0, 100]",
        ));
    }

    Ok(RiskSettings {
        reward_risk_ratio,
        risk_per_trade_pct,
    })
}

fn build_session(config: &dyn ConfigPort) -> Result<SessionSettings, SignalError> {
    let initial_balance = config.get_double("session", "initial_balance", 10_000.0);
    if !(initial_balance.is_finite() && initial_balance > 0.0) {
        return Err(invalid("session", "initial_balance", "initial_balance must be positive"));
    }

    let mode = match non_blank(config, "session", "mode")
        .unwrap_or_else(|| "DEMO".to_string())
        .to_uppercase()
        .as_str()
    {
        "DEMO" => TradingMode::Demo,
        "LIVE" | "REAL" => TradingMode::Live,
        other => {
            return Err(invalid(
                "session",
                "mode",
                format!("unknown mode '{other}' (expected DEMO or LIVE)"),
            ));
        }
    };

    Ok(SessionSettings {
        initial_balance,
        mode,
    })
}

fn build_schedule(config: &dyn ConfigPort) -> Result<ScheduleSettings, SignalError> {
    let interval = config.get_int("schedule", "interval_secs", 3600);
    let interval_secs = u64::try_from(interval)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid("schedule", "interval_secs", "interval_secs must be positive"))?;

    let delay = config.get_int("schedule", "first_delay_secs", 10);
    let first_delay_secs = u64::try_from(delay).map_err(|_| {
        invalid("schedule", "first_delay_secs", "first_delay_secs must be non-negative")
    })?;

    Ok(ScheduleSettings {
        interval_secs,
        first_delay_secs,
    })
}

/// Both keys absent disables the control surface; one without the other is an error.
fn build_telegram(config: &dyn ConfigPort) -> Result<Option<TelegramSettings>, SignalError> {
    let token = config.get_secret("telegram", "token", TELEGRAM_TOKEN_ENV);
    let chat_id = non_blank(config, "telegram", "chat_id");

    match (token, chat_id) {
        (None, None) => Ok(None),
        (Some(token), Some(chat_id)) => Ok(Some(TelegramSettings { token, chat_id })),
        (Some(_), None) => Err(SignalError::ConfigMissing {
            section: "telegram".into(),
            key: "chat_id".into(),
        }),
        (None, Some(_)) => Err(SignalError::ConfigMissing {
            section: "telegram".into(),
            key: "token".into(),
        }),
    }
}
