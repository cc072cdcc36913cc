//! Telegram delivery of strong signals and run summaries.
//!
//! Delivery failures are logged and never fail the run.

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TelegramConfig;
use crate::types::{OverallSignal, TradingSignal};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Telegram bot client bound to one chat.
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self::with_base_url(config, TELEGRAM_API)
    }

    pub fn with_base_url(config: &TelegramConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    /// Send one HTML-formatted message. Errors are logged, not returned.
    pub async fn send(&self, text: &str) {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("telegram message delivered");
            }
            Ok(response) => {
                warn!(status = %response.status(), "telegram rejected message");
            }
            Err(e) => {
                warn!(error = %e, "telegram delivery failed");
            }
        }
    }

    /// Notify about one strong signal.
    pub async fn send_signal(&self, signal: &TradingSignal) {
        self.send(&format_signal_message(signal)).await;
    }
}

/// Per-signal alert text.
pub fn format_signal_message(signal: &TradingSignal) -> String {
    let emoji = match signal.overall_signal {
        OverallSignal::StrongBuy => "🟢🟢",
        OverallSignal::Buy => "🟢",
        OverallSignal::Neutral => "⚪",
        OverallSignal::Sell => "🔴",
        OverallSignal::StrongSell => "🔴🔴",
    };

    format!(
        "{emoji} <b>{}</b>: {}\n\
         Price: ${:.4}\n\
         Zone: {} | RSI: {:.1} ({})\n\
         Votes: {} bull / {} bear\n\
         Forecast 1d: ${:.4}\n\
         {}",
        signal.symbol,
        signal.overall_signal.as_str(),
        signal.current_price,
        signal.pivot_zone.as_str(),
        signal.rsi_value,
        signal.rsi_zone.as_str(),
        signal.bull_count,
        signal.bear_count,
        signal.forecast_1d,
        signal.timestamp,
    )
}

/// End-of-run summary text. Only sent when the run produced strong signals.
pub fn format_summary_message(
    succeeded: usize,
    attempted: usize,
    strong: &[TradingSignal],
    duration_seconds: f64,
) -> String {
    let mut text = format!(
        "📊 <b>Signal run complete</b>\n\
         Symbols: {}/{} succeeded\n\
         Duration: {:.0}s\n\
         Strong signals ({}):\n",
        succeeded,
        attempted,
        duration_seconds,
        strong.len(),
    );

    for signal in strong {
        text.push_str(&format!(
            "  {} {} @ ${:.4}\n",
            signal.symbol,
            signal.overall_signal.as_str(),
            signal.current_price,
        ));
    }

    text
}
