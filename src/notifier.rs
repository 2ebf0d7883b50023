//! Telegram notification sink for buy signals

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::{Result, ScanError, SignalEvent};

/// Notifier configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub bot_token: Option<String>,
    pub chat_id: String,
    pub app_url: String,
    pub timeout_secs: u64,
}

impl NotifierConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_target_group.clone(),
            app_url: config.app_url.clone(),
            timeout_secs: 10,
        }
    }
}

/// HTTP client for the Telegram Bot API
///
/// One call per signal; a failed send is logged by the caller and
/// dropped. Duplicate delivery is worse than a missed one at a daily
/// cadence, so there is no retry and no queue.
pub struct TelegramNotifier {
    config: NotifierConfig,
    client: Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            config,
            client,
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    /// Point the notifier at a different host (used by tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.config.bot_token.is_some()
    }

    /// Render the outgoing HTML message for a signal.
    pub fn render_message(&self, signal: &SignalEvent) -> String {
        let chart_url = format!("{}/?symbol={}", self.config.app_url, signal.symbol);
        format!(
            "✨ <b>{}</b> | BUY SIGNAL ✨\n\n\
             📌 Price: ${:.2}\n\
             📉 BB (1W): ${:.2}\n\n\
             🔍 <a href=\"{}\">View Chart</a>",
            signal.symbol, signal.price, signal.bb_lower_weekly, chart_url
        )
    }

    /// Dispatch one signal to the configured chat.
    pub async fn send_signal(&self, signal: &SignalEvent) -> Result<()> {
        let Some(token) = &self.config.bot_token else {
            warn!(
                "TELEGRAM_BOT_TOKEN not set; skipping delivery of {} signal",
                signal.symbol
            );
            return Err(ScanError::ConfigMissing("TELEGRAM_BOT_TOKEN".to_string()));
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let payload = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": self.render_message(signal),
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScanError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::NotificationFailed(format!(
                "Telegram API error ({}): {}",
                status, body
            )));
        }

        debug!(
            "Buy signal for {} sent to {}",
            signal.symbol, self.config.chat_id
        );
        Ok(())
    }

    /// Post the fixed SOL example signal; used by the self-test route.
    pub async fn send_test(&self) -> Result<()> {
        let example = SignalEvent {
            symbol: "SOL".to_string(),
            bar_time: 0,
            price: 147.82,
            bb_lower_weekly: 142.35,
            detected_at: chrono::Utc::now(),
        };
        self.send_signal(&example).await
    }
}
