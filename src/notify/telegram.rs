//! Telegram notification channel
//!
//! Best-effort delivery to a Telegram chat via the Bot API. Missing
//! credentials make every send a no-op returning false; that is warned once
//! at construction, not on every call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, warn};

use crate::monitoring::alert::NotificationChannel;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramNotifier {
    client: Client,
    /// None when credentials are missing; sends become no-ops
    credentials: Option<Credentials>,
}

struct Credentials {
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        let credentials = match (bot_token, chat_id) {
            (Some(bot_token), Some(chat_id))
                if !bot_token.trim().is_empty() && !chat_id.trim().is_empty() =>
            {
                info!("Telegram notifications configured");
                Some(Credentials { bot_token, chat_id })
            }
            _ => {
                warn!("Telegram bot token or chat ID not configured, alerts will not be delivered");
                None
            }
        };

        Self {
            client,
            credentials,
        }
    }

    /// Build from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            std::env::var("TELEGRAM_CHAT_ID").ok(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn send(&self, text: &str) -> bool {
        let Some(credentials) = &self.credentials else {
            return false;
        };

        let url = format!(
            "{TELEGRAM_API_BASE}{}/sendMessage",
            credentials.bot_token
        );
        let payload = json!({
            "chat_id": credentials.chat_id,
            "text": text,
        });

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Telegram message sent");
                true
            }
            Ok(response) => {
                error!(status = %response.status(), "Telegram send rejected");
                false
            }
            Err(e) => {
                error!(error = %e, "Telegram send failed");
                false
            }
        }
    }
}
