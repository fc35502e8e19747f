//! Telegram Bot API: outbound messages and inbound control commands.
//!
//! Only messages from the configured chat are surfaced as commands.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::message_format::{format_cycle, format_reply};
use crate::domain::control::ControlReply;
use crate::domain::cycle::CycleReport;
use crate::domain::error::SignalError;
use crate::ports::notification_port::NotificationPort;

const BASE_URL: &str = "https://api.telegram.org";
pub const LONG_POLL_SECS: u64 = 30;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Text messages from one `getUpdates` call plus the offset acknowledging them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateBatch {
    pub texts: Vec<String>,
    pub next_offset: Option<i64>,
}

fn notify_err(reason: impl Into<String>) -> SignalError {
    SignalError::Notify {
        reason: reason.into(),
    }
}

pub struct TelegramAdapter {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramAdapter {
    pub fn new(token: String, chat_id: String) -> Result<Self, SignalError> {
        Self::with_base_url(token, chat_id, BASE_URL)
    }

    pub fn with_base_url(
        token: String,
        chat_id: String,
        base_url: &str,
    ) -> Result<Self, SignalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .map_err(|e| notify_err(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            token,
            chat_id,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }

    pub fn send_text(&self, text: &str) -> Result<(), SignalError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .map_err(|e| notify_err(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(notify_err(format!("Telegram API error {status}: {body}")));
        }
        Ok(())
    }

    /// Long-poll for new messages after `offset`.
    pub fn poll_updates(&self, offset: Option<i64>) -> Result<UpdateBatch, SignalError> {
        let mut query = vec![("timeout", LONG_POLL_SECS.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let body = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&query)
            .send()
            .and_then(|r| r.text())
            .map_err(|e| notify_err(e.to_string()))?;

        let batch = parse_updates(&body, &self.chat_id)?;
        debug!(messages = batch.texts.len(), next_offset = ?batch.next_offset, "telegram poll");
        Ok(batch)
    }
}

impl NotificationPort for TelegramAdapter {
    fn publish_cycle(&self, report: &CycleReport) -> Result<(), SignalError> {
        match format_cycle(report) {
            Some(text) => self.send_text(&text),
            None => Ok(()),
        }
    }

    fn publish_reply(&self, reply: &ControlReply) -> Result<(), SignalError> {
        self.send_text(&format_reply(reply))
    }
}

/// Parse a `getUpdates` body. Every update advances the offset, including
/// ones from other chats, so they are not redelivered.
pub fn parse_updates(body: &str, chat_id: &str) -> Result<UpdateBatch, SignalError> {
    let resp: ApiResponse<Vec<Update>> = serde_json::from_str(body)
        .map_err(|e| notify_err(format!("getUpdates JSON: {e}")))?;
    if !resp.ok {
        return Err(notify_err(format!(
            "getUpdates failed: {}",
            resp.description.unwrap_or_default()
        )));
    }

    let updates = resp.result.unwrap_or_default();
    let next_offset = updates.iter().map(|u| u.update_id + 1).max();
    let texts = updates
        .into_iter()
        .filter_map(|u| u.message)
        .filter(|m| m.chat.id.to_string() == chat_id.trim())
        .filter_map(|m| m.text)
        .collect();

    Ok(UpdateBatch { texts, next_offset })
}
