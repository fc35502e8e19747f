//! CLI definition and dispatch.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::adapters::console_notifier::ConsoleNotifier;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::control::{ControlCommand, ControlReply};
use crate::domain::cycle::{CycleOutcome, CycleReport, CycleRunner};
use crate::domain::decision::DecisionEngine;
use crate::domain::error::SignalError;
use crate::domain::market_data::MarketDataService;
use crate::domain::sentiment::SentimentScorer;
use crate::domain::session::{self, SessionState, SharedSession};
use crate::domain::settings::{MarketSettings, NewsSettings, ProviderKind, Settings};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::news_port::NewsPort;
use crate::ports::notification_port::NotificationPort;

#[derive(Parser, Debug)]
#[command(name = "goldsignal", about = "Periodic gold market signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one decision cycle and print the result
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Run the periodic scheduler, with chat control when configured
    Run {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze { config, symbol } => run_analyze(&config, symbol.as_deref()),
        Command::Run { config } => run_loop(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SignalError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn load_settings(path: &PathBuf) -> Result<Settings, ExitCode> {
    let adapter = load_config(path)?;
    Settings::from_config(&adapter).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

pub fn build_market_provider(
    market: &MarketSettings,
) -> Result<Box<dyn MarketDataPort>, SignalError> {
    match &market.provider {
        ProviderKind::Csv { dir } => Ok(Box::new(CsvAdapter::new(dir.clone()))),
        #[cfg(feature = "http")]
        ProviderKind::Yahoo => Ok(Box::new(
            crate::adapters::yahoo_adapter::YahooAdapter::new()?,
        )),
        #[cfg(not(feature = "http"))]
        ProviderKind::Yahoo => Err(SignalError::ConfigInvalid {
            section: "market".into(),
            key: "provider".into(),
            reason: "yahoo provider requires the `http` feature".into(),
        }),
    }
}

pub fn build_sentiment(news: &NewsSettings) -> Result<SentimentScorer, SignalError> {
    let provider: Option<Box<dyn NewsPort>> = match &news.api_key {
        #[cfg(feature = "http")]
        Some(key) => Some(Box::new(
            crate::adapters::newsapi_adapter::NewsApiAdapter::new(key.clone())?,
        )),
        #[cfg(not(feature = "http"))]
        Some(_) => {
            warn!("news API key set but built without the `http` feature; sentiment disabled");
            None
        }
        None => None,
    };
    Ok(SentimentScorer::new(provider, news.query.clone()))
}

pub fn build_runner(settings: &Settings, session: SharedSession) -> Result<CycleRunner, SignalError> {
    let provider = build_market_provider(&settings.market)?;
    let market = MarketDataService::new(provider, settings.market.fetch.clone());
    let engine = DecisionEngine::new(build_sentiment(&settings.news)?);
    Ok(CycleRunner::new(
        settings.market.symbol.clone(),
        market,
        engine,
        settings.risk,
        session,
    ))
}

fn run_analyze(config_path: &PathBuf, symbol: Option<&str>) -> ExitCode {
    let mut settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    if let Some(symbol) = symbol {
        settings.market.symbol = symbol.to_string();
    }

    let mut state = SessionState::new(settings.session.initial_balance, settings.session.mode);
    state.start();
    let runner = match build_runner(&settings, session::shared(state)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let Some(report) = runner.analyze(Utc::now()) else {
        return ExitCode::SUCCESS;
    };
    if let Err(e) = ConsoleNotifier::stdout().publish_cycle(&report) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    match report.outcome {
        CycleOutcome::Failed(_) => ExitCode::from(3),
        _ => ExitCode::SUCCESS,
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    eprintln!("Config validated successfully");
    eprintln!("\nMarket:");
    eprintln!("  symbol:   {}", settings.market.symbol);
    eprintln!("  provider: {}", settings.market.provider);
    eprintln!(
        "  lookback: {}d daily, {}d hourly",
        settings.market.fetch.daily_lookback_days, settings.market.fetch.hourly_lookback_days
    );
    eprintln!("\nNews:");
    match &settings.news.api_key {
        Some(_) => eprintln!("  enabled ({} headlines)", settings.news.query.limit),
        None => eprintln!("  disabled (sentiment fixed at NEUTRAL)"),
    }
    eprintln!("\nRisk:");
    eprintln!("  reward/risk:    {}", settings.risk.reward_risk_ratio);
    eprintln!("  risk per trade: {}%", settings.risk.risk_per_trade_pct);
    eprintln!("\nSession:");
    eprintln!("  balance: {}", settings.session.initial_balance);
    eprintln!("  mode:    {}", settings.session.mode);
    eprintln!(
        "  every {}s (first after {}s)",
        settings.schedule.interval_secs, settings.schedule.first_delay_secs
    );
    eprintln!(
        "  control: {}",
        if settings.telegram.is_some() {
            "telegram"
        } else {
            "none (starts immediately)"
        }
    );
    ExitCode::SUCCESS
}

fn publish_report(notifier: &dyn NotificationPort, report: &CycleReport) {
    if let Err(e) = notifier.publish_cycle(report) {
        warn!(error = %e, "failed to publish cycle report");
    }
}

/// Cycle timer: `tick` fires after `first_delay`, then every `interval`.
/// A message on `rearm` restarts the countdown from `first_delay`.
pub fn run_schedule(
    rearm: &Receiver<()>,
    first_delay: Duration,
    interval: Duration,
    mut tick: impl FnMut() -> ControlFlow<()>,
) {
    let mut wait = first_delay;
    loop {
        match rearm.recv_timeout(wait) {
            Ok(()) => {
                debug!(delay_secs = first_delay.as_secs(), "schedule re-armed");
                wait = first_delay;
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(wait),
        }
        if tick().is_break() {
            return;
        }
        wait = interval;
    }
}

fn spawn_scheduler(
    runner: Arc<CycleRunner>,
    notifier: Arc<dyn NotificationPort>,
    first_delay: Duration,
    interval: Duration,
    rearm: Receiver<()>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("scheduler".into())
        .spawn(move || {
            run_schedule(&rearm, first_delay, interval, || {
                if let Some(report) = runner.run_cycle(Utc::now()) {
                    publish_report(notifier.as_ref(), &report);
                }
                ControlFlow::Continue(())
            })
        })
}

/// Apply one chat command. A successful `/start` re-arms the scheduler;
/// `/analyze` runs on its own thread so polling continues while providers
/// are queried.
pub fn handle_command(
    command: ControlCommand,
    runner: &Arc<CycleRunner>,
    notifier: &Arc<dyn NotificationPort>,
    rearm: Option<&Sender<()>>,
) {
    let reply = command.apply(&mut session::lock(runner.session()));
    if let Err(e) = notifier.publish_reply(&reply) {
        warn!(error = %e, "failed to publish control reply");
    }
    if reply == ControlReply::Started {
        if let Some(Err(e)) = rearm.map(|tx| tx.send(())) {
            warn!(error = %e, "scheduler gone, cannot re-arm");
        }
        return;
    }
    if reply != ControlReply::AnalyzeRequested {
        return;
    }

    let runner = Arc::clone(runner);
    let notifier = Arc::clone(notifier);
    let spawned = thread::Builder::new()
        .name("manual-analyze".into())
        .spawn(move || match runner.analyze(Utc::now()) {
            Some(report) => publish_report(notifier.as_ref(), &report),
            None => info!("manual analysis skipped, a cycle is already running"),
        });
    if let Err(e) = spawned {
        error!(error = %e, "failed to spawn manual analysis");
    }
}

fn run_loop(config_path: &PathBuf) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let session = session::shared(SessionState::new(
        settings.session.initial_balance,
        settings.session.mode,
    ));
    let runner = match build_runner(&settings, Arc::clone(&session)) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let first_delay = Duration::from_secs(settings.schedule.first_delay_secs);
    let interval = Duration::from_secs(settings.schedule.interval_secs);

    #[cfg(feature = "http")]
    if let Some(telegram) = &settings.telegram {
        use crate::adapters::telegram_adapter::TelegramAdapter;

        let adapter = match TelegramAdapter::new(telegram.token.clone(), telegram.chat_id.clone()) {
            Ok(a) => Arc::new(a),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };
        let notifier: Arc<dyn NotificationPort> = adapter.clone();
        let (rearm_tx, rearm_rx) = mpsc::channel();
        if let Err(e) = spawn_scheduler(
            Arc::clone(&runner),
            Arc::clone(&notifier),
            first_delay,
            interval,
            rearm_rx,
        ) {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
        info!(symbol = %settings.market.symbol, "waiting for /start on telegram");
        poll_telegram(&adapter, &runner, &notifier, &rearm_tx);
    }

    #[cfg(not(feature = "http"))]
    if settings.telegram.is_some() {
        warn!("telegram configured but built without the `http` feature; using console");
    }

    session::lock(&session).start();
    let notifier: Arc<dyn NotificationPort> = Arc::new(ConsoleNotifier::stdout());
    info!(
        symbol = %settings.market.symbol,
        interval_secs = settings.schedule.interval_secs,
        "scheduler started"
    );
    let (_rearm_tx, rearm_rx) = mpsc::channel();
    match spawn_scheduler(runner, notifier, first_delay, interval, rearm_rx) {
        Ok(handle) => {
            if handle.join().is_err() {
                error!("scheduler thread panicked");
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

#[cfg(feature = "http")]
fn poll_telegram(
    adapter: &crate::adapters::telegram_adapter::TelegramAdapter,
    runner: &Arc<CycleRunner>,
    notifier: &Arc<dyn NotificationPort>,
    rearm: &Sender<()>,
) -> ! {
    let mut offset = None;
    loop {
        match adapter.poll_updates(offset) {
            Ok(batch) => {
                offset = batch.next_offset.or(offset);
                for text in &batch.texts {
                    match ControlCommand::parse(text) {
                        Some(command) => handle_command(command, runner, notifier, Some(rearm)),
                        None => info!(text = %text, "ignoring non-command message"),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "telegram poll failed");
                thread::sleep(Duration::from_secs(5));
            }
        }
    }
}
