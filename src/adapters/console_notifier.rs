//! Notification channel that prints to stdout, used when no chat is configured.

use std::io::Write;
use std::sync::Mutex;

use crate::adapters::message_format::{format_cycle, format_reply};
use crate::domain::control::ControlReply;
use crate::domain::cycle::CycleReport;
use crate::domain::error::SignalError;
use crate::ports::notification_port::NotificationPort;

pub struct ConsoleNotifier<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleNotifier {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self, header: &str, text: &str) -> Result<(), SignalError> {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(out, "{header}\n{text}\n")?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> NotificationPort for ConsoleNotifier<W> {
    fn publish_cycle(&self, report: &CycleReport) -> Result<(), SignalError> {
        match format_cycle(report) {
            Some(text) => {
                let header = format!(
                    "[{} {}]",
                    report.at.format("%Y-%m-%d %H:%M:%S UTC"),
                    report.symbol
                );
                self.write(&header, &text)
            }
            None => Ok(()),
        }
    }

    fn publish_reply(&self, reply: &ControlReply) -> Result<(), SignalError> {
        self.write("[control]", &format_reply(reply))
    }
}
