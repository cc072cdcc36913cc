use crate::error::ConfigError;
use std::env;

/// Built-in trading universe, used when TRADING_SYMBOLS is not set.
///
/// Gate.io perpetual futures spelling: base/quote:settlement.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "BTC/USDT:USDT",
    "ETH/USDT:USDT",
    "BNB/USDT:USDT",
    "SOL/USDT:USDT",
    "XRP/USDT:USDT",
    "ADA/USDT:USDT",
    "AVAX/USDT:USDT",
    "DOT/USDT:USDT",
    "DOGE/USDT:USDT",
    "LINK/USDT:USDT",
    "ATOM/USDT:USDT",
    "NEAR/USDT:USDT",
    "ALGO/USDT:USDT",
    "VET/USDT:USDT",
    "FIL/USDT:USDT",
    "ICP/USDT:USDT",
    "AAVE/USDT:USDT",
    "XTZ/USDT:USDT",
    "UNI/USDT:USDT",
    "CRV/USDT:USDT",
    "LDO/USDT:USDT",
    "OP/USDT:USDT",
    "SUI/USDT:USDT",
    "APT/USDT:USDT",
    "ARB/USDT:USDT",
    "SEI/USDT:USDT",
    "TIA/USDT:USDT",
    "INJ/USDT:USDT",
    "FET/USDT:USDT",
    "RUNE/USDT:USDT",
    "IMX/USDT:USDT",
    "SAND/USDT:USDT",
    "MANA/USDT:USDT",
    "PEPE/USDT:USDT",
    "SHIB/USDT:USDT",
    "WIF/USDT:USDT",
    "BONK/USDT:USDT",
    "KAS/USDT:USDT",
    "JUP/USDT:USDT",
    "PYTH/USDT:USDT",
    "WLD/USDT:USDT",
    "HBAR/USDT:USDT",
    "KAVA/USDT:USDT",
    "ROSE/USDT:USDT",
];

/// Telegram notification credentials.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// Fetch retry and pacing knobs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Attempts per symbol/timeframe before giving up.
    pub max_retries: u32,
    /// Base delay between attempts, seconds. Rate-limit waits scale with
    /// the attempt index.
    pub retry_delay_secs: u64,
    /// Minimum spacing between exchange requests, milliseconds. Enforced
    /// globally across workers.
    pub request_interval_ms: u64,
    /// Wall-clock budget for one symbol's fetch+compute+persist, seconds.
    pub symbol_budget_secs: u64,
    /// Symbols processed concurrently.
    pub max_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 5,
            request_interval_ms: 1000,
            symbol_budget_secs: 120,
            max_concurrency: 4,
        }
    }
}

/// Application configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gate.io API key (required).
    pub api_key: String,
    /// Gate.io API secret (required).
    pub api_secret: String,
    /// Telegram credentials; notifications are disabled when absent.
    pub telegram: Option<TelegramConfig>,
    /// SQLite database path.
    pub database_path: String,
    /// Symbol universe for this process.
    pub symbols: Vec<String>,
    pub fetch: FetchConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing exchange credentials are a fatal startup error; everything
    /// else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("GATE_API_KEY").ok().filter(|s| !s.is_empty());
        let api_secret = env::var("GATE_API_SECRET").ok().filter(|s| !s.is_empty());

        let (api_key, api_secret) = match (api_key, api_secret) {
            (Some(k), Some(s)) => (k, s),
            _ => return Err(ConfigError::MissingCredentials),
        };

        let telegram = match (
            env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "trading_signals.db".to_string());

        let symbols = env::var("TRADING_SYMBOLS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|sym| sym.trim().to_string())
                    .filter(|sym| !sym.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        let defaults = FetchConfig::default();
        let fetch = FetchConfig {
            max_retries: env::var("FETCH_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay_secs: env::var("FETCH_RETRY_DELAY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.retry_delay_secs),
            request_interval_ms: env::var("REQUEST_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_interval_ms),
            symbol_budget_secs: env::var("SYMBOL_BUDGET_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.symbol_budget_secs),
            max_concurrency: env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_concurrency),
        };

        Ok(Self {
            api_key,
            api_secret,
            telegram,
            database_path,
            symbols,
            fetch,
        })
    }
}
