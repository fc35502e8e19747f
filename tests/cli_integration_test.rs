//! CLI wiring tests: INI on disk → settings → CSV provider → one cycle.

mod common;

use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use common::*;
use goldsignal::cli::{self, Cli};
use goldsignal::domain::cycle::CycleOutcome;
use goldsignal::domain::decision::Verdict;
use goldsignal::domain::session::{self, SessionState, TradingMode};
use goldsignal::domain::settings::ProviderKind;
use std::fmt::Write as _;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration as StdDuration;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_csv(path: &Path, start: DateTime<Utc>, step: Duration, closes: &[f64], spread: f64) {
    let mut body = String::from("Datetime,Open,High,Low,Close,Volume\n");
    for (i, close) in closes.iter().enumerate() {
        let ts = start + step * i as i32;
        writeln!(
            body,
            "{},{close},{},{},{close},1000",
            ts.format("%Y-%m-%d %H:%M:%S"),
            close + spread,
            close - spread
        )
        .unwrap();
    }
    std::fs::write(path, body).unwrap();
}

fn csv_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_csv(
        &dir.path().join("GC=F_1d.csv"),
        start(),
        Duration::days(1),
        &uptrend_daily_closes(),
        DAILY_SPREAD,
    );
    write_csv(
        &dir.path().join("GC=F_1h.csv"),
        hourly_start(),
        Duration::hours(1),
        &uptrend_hourly_closes(),
        1.0,
    );
    dir
}

fn csv_ini(dir: &Path) -> String {
    format!(
        r#"
[market]
symbol = GC=F
provider = csv
csv_dir = {}

[news]
enabled = false

[risk]
reward_risk_ratio = 2.0
risk_per_trade_pct = 1.5

[session]
initial_balance = 25000
mode = demo

[schedule]
interval_secs = 60
first_delay_secs = 0
"#,
        dir.display()
    )
}

fn path_of(file: &tempfile::NamedTempFile) -> PathBuf {
    file.path().to_path_buf()
}

fn exit_eq(actual: ExitCode, expected: ExitCode) -> bool {
    format!("{actual:?}") == format!("{expected:?}")
}

mod settings_loading {
    use super::*;

    #[test]
    fn csv_settings_load() {
        let dir = csv_dir();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let settings = cli::load_settings(&path_of(&ini)).unwrap();

        assert_eq!(settings.market.symbol, "GC=F");
        assert_eq!(
            settings.market.provider,
            ProviderKind::Csv {
                dir: dir.path().to_path_buf()
            }
        );
        assert_eq!(settings.news.api_key, None);
        assert_eq!(settings.session.initial_balance, 25_000.0);
        assert_eq!(settings.session.mode, TradingMode::Demo);
        assert_eq!(settings.schedule.interval_secs, 60);
        assert!(settings.telegram.is_none());
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = cli::load_settings(&PathBuf::from("/nonexistent/goldsignal.ini"));
        assert!(exit_eq(result.unwrap_err(), ExitCode::from(2)));
    }

    #[test]
    fn invalid_value_is_config_error() {
        let ini = write_temp_ini("[risk]\nreward_risk_ratio = 0\n");
        let result = cli::load_settings(&path_of(&ini));
        assert!(exit_eq(result.unwrap_err(), ExitCode::from(2)));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_succeeds() {
        let dir = csv_dir();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let path = ini.path().to_str().unwrap();
        let code = cli::run(Cli::parse_from(["goldsignal", "validate", "--config", path]));
        assert!(exit_eq(code, ExitCode::SUCCESS));
    }

    #[test]
    fn csv_provider_without_dir_fails() {
        let ini = write_temp_ini("[market]\nprovider = csv\n");
        let path = ini.path().to_str().unwrap();
        let code = cli::run(Cli::parse_from(["goldsignal", "validate", "-c", path]));
        assert!(exit_eq(code, ExitCode::from(2)));
    }
}

mod analyze_pipeline {
    use super::*;

    #[test]
    fn csv_provider_feeds_a_full_cycle() {
        let dir = csv_dir();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let settings = cli::load_settings(&path_of(&ini)).unwrap();

        let shared = session::shared(SessionState::new(
            settings.session.initial_balance,
            settings.session.mode,
        ));
        let runner = cli::build_runner(&settings, shared).unwrap();

        let report = runner.analyze(Utc::now()).unwrap();
        let decision = report.outcome.decision().unwrap();
        assert_ne!(decision.verdict, Verdict::Error);
        assert_eq!(decision.technical_rationale[0], "Trend D1 LONG.");
        assert_eq!(decision.technical_rationale[1], "MACD H4 LONG.");
        assert_eq!(
            decision.fundamental_rationale,
            "News sentiment: NEUTRAL (API key not configured)."
        );
        assert_eq!(
            decision.reference_price,
            uptrend_daily_closes().last().copied()
        );
    }

    #[test]
    fn missing_csv_is_error_decision() {
        let dir = tempfile::tempdir().unwrap();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let settings = cli::load_settings(&path_of(&ini)).unwrap();
        let runner = cli::build_runner(&settings, running_session()).unwrap();

        let report = runner.run_cycle(Utc::now()).unwrap();
        let CycleOutcome::Failed(decision) = report.outcome else {
            panic!("expected Failed, got {:?}", report.outcome);
        };
        assert!(decision.technical_rationale[0].starts_with("data unavailable: "));
    }

    #[test]
    fn analyze_command_succeeds_on_csv_data() {
        let dir = csv_dir();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let path = ini.path().to_str().unwrap();
        let code = cli::run(Cli::parse_from(["goldsignal", "analyze", "--config", path]));
        assert!(exit_eq(code, ExitCode::SUCCESS));
    }

    #[test]
    fn analyze_command_exits_3_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let ini = write_temp_ini(&csv_ini(dir.path()));
        let path = ini.path().to_str().unwrap();
        let code = cli::run(Cli::parse_from([
            "goldsignal",
            "analyze",
            "--config",
            path,
            "--symbol",
            "SI=F",
        ]));
        assert!(exit_eq(code, ExitCode::from(3)));
    }
}

mod scheduling {
    use super::*;

    #[test]
    fn first_tick_after_initial_delay() {
        let (_rearm_tx, rearm_rx) = mpsc::channel();
        let mut ticks = 0;
        cli::run_schedule(&rearm_rx, StdDuration::ZERO, StdDuration::from_secs(3600), || {
            ticks += 1;
            ControlFlow::Break(())
        });
        assert_eq!(ticks, 1);
    }

    #[test]
    fn rearm_restarts_countdown_from_initial_delay() {
        let (rearm_tx, rearm_rx) = mpsc::channel();
        let (fired_tx, fired_rx) = mpsc::channel();

        let scheduler = thread::spawn(move || {
            let mut ticks = 0;
            cli::run_schedule(
                &rearm_rx,
                StdDuration::from_millis(20),
                StdDuration::from_secs(3600),
                || {
                    ticks += 1;
                    fired_tx.send(ticks).unwrap();
                    if ticks == 2 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
        });

        assert_eq!(fired_rx.recv_timeout(StdDuration::from_secs(5)), Ok(1));
        // without the re-arm the next tick is an hour away
        rearm_tx.send(()).unwrap();
        assert_eq!(fired_rx.recv_timeout(StdDuration::from_secs(5)), Ok(2));
        scheduler.join().unwrap();
    }
}
