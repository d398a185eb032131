//! Telegram Bot API sink (`sendMessage`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::NotifyError;
use crate::sink::NotificationSink;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends messages to one chat through a bot.
#[derive(Clone)]
pub struct TelegramSink {
    http_client: Client,
    api_base: String,
    token: String,
    chat_id: String,
    parse_mode: Option<String>,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("chat_id", &self.chat_id)
            .field("parse_mode", &self.parse_mode)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramSink {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
            parse_mode: None,
        }
    }

    /// Telegram `parse_mode` (`Markdown`, `MarkdownV2`, `HTML`). Blank sends
    /// plain text.
    pub fn with_parse_mode(mut self, mode: impl Into<String>) -> Self {
        let mode = mode.into();
        self.parse_mode = if mode.trim().is_empty() {
            None
        } else {
            Some(mode)
        };
        self
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, NotifyError> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Upstream(e.to_string()))?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    fn payload<'a>(&'a self, text: &'a str) -> SendMessage<'a> {
        SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: self.parse_mode.as_deref(),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if text.trim().is_empty() {
            return Err(NotifyError::EmptyMessage);
        }

        // Request errors carry the URL, which embeds the bot token.
        let response = self
            .http_client
            .post(self.endpoint())
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                warn!(error = %e, "Telegram request failed");
                NotifyError::Upstream(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let api: Option<ApiResponse> = serde_json::from_str(&body).ok();

        match api {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                debug!(chars = text.chars().count(), "Telegram message sent");
                Ok(())
            }
            Some(ApiResponse { description, .. }) => {
                let reason = description.unwrap_or_else(|| "no description".to_string());
                warn!(status = %status, error = %reason, "Telegram API error");
                Err(NotifyError::Upstream(format!("{}: {}", status, reason)))
            }
            None => {
                warn!(status = %status, "Unexpected Telegram response");
                Err(NotifyError::Upstream(format!("{}: {}", status, body)))
            }
        }
    }
}
