//! Operator notifications through the Telegram Bot API.

use serde::Deserialize;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.config.api_url)
            .field("chat_id", &self.config.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        Self { client, config }
    }

    /// Send an HTML-formatted message to the configured chat.
    pub async fn send_html(&self, text: &str) -> Result<(), ApiError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token
        );
        let response = self
            .client
            .post(url)
            .json(&json!({
                "chat_id": self.config.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            // The request URL embeds the bot token; keep it out of the message.
            .map_err(|e| ApiError::Upstream(format!("Telegram error: {}", e.without_url())))?;

        let status = response.status();
        let body: SendMessageResponse = response.json().await.unwrap_or_default();
        if !status.is_success() || !body.ok {
            let msg = body
                .description
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(ApiError::Upstream(format!("Telegram error: {msg}")));
        }
        tracing::debug!(chat_id = %self.config.chat_id, "notification delivered");
        Ok(())
    }
}
