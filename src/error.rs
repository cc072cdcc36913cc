use thiserror::Error;

/// Errors raised by the exchange collaborator.
///
/// The fetcher's retry logic branches on these variants; nothing past the
/// fetcher boundary ever sees one.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("exchange error: {0}")]
    Exchange(String),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        // Transport-level failures are all retried the same way.
        ExchangeError::Network(e.to_string())
    }
}

/// Startup configuration errors. These abort the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GATE_API_KEY and GATE_API_SECRET are required; set them in the environment or .env file")]
    MissingCredentials,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_error_display() {
        let e = ExchangeError::InvalidSymbol("FOO/USDT:USDT".to_string());
        assert!(e.to_string().contains("FOO/USDT:USDT"));
        assert_eq!(ExchangeError::RateLimited.to_string(), "rate limit exceeded");
    }

    #[test]
    fn test_config_error_mentions_variables() {
        let msg = ConfigError::MissingCredentials.to_string();
        assert!(msg.contains("GATE_API_KEY"));
        assert!(msg.contains("GATE_API_SECRET"));
    }
}
