//! Candle fetching with retry, rate-limit backoff, and symbol fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ExchangeError;
use crate::services::limiter::RateLimiter;
use crate::sources::ExchangeApi;
use crate::types::{Candle, Timeframe};

/// Wraps an exchange client with request pacing, the retry policy, and the
/// gap filling the indicator stage depends on.
pub struct MarketDataFetcher<E> {
    exchange: E,
    limiter: Arc<RateLimiter>,
    max_retries: u32,
    retry_delay: Duration,
}

impl<E: ExchangeApi> MarketDataFetcher<E> {
    pub fn new(
        exchange: E,
        limiter: Arc<RateLimiter>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            exchange,
            limiter,
            max_retries,
            retry_delay,
        }
    }

    /// Fetch a candle series, retrying transient failures.
    ///
    /// Rate limits back off with the attempt index, network and generic
    /// exchange errors wait a fixed delay, and an invalid-symbol error on
    /// the first attempt falls back once to the spot spelling (settlement
    /// suffix stripped). Authentication errors give up immediately. Returns
    /// None once retries are exhausted or the exchange sends an empty
    /// series; callers skip the symbol.
    pub async fn fetch(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Option<Vec<Candle>> {
        let mut symbol = symbol.to_string();

        for attempt in 0..self.max_retries {
            self.limiter.acquire().await;
            match self.exchange.fetch_ohlcv(&symbol, timeframe, limit).await {
                Ok(candles) if candles.is_empty() => {
                    warn!(%symbol, %timeframe, "exchange returned an empty series");
                    return None;
                }
                Ok(mut candles) => {
                    fill_gaps(&mut candles);
                    debug!(%symbol, %timeframe, bars = candles.len(), "fetched candles");
                    return Some(candles);
                }
                Err(ExchangeError::RateLimited) => {
                    let wait = self.retry_delay * (attempt + 1);
                    warn!(%symbol, %timeframe, attempt, wait_secs = wait.as_secs(), "rate limited, backing off");
                    tokio::time::sleep(wait).await;
                }
                Err(ExchangeError::Network(e)) => {
                    warn!(%symbol, %timeframe, attempt, error = %e, "network error, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(ExchangeError::InvalidSymbol(e)) if attempt == 0 && symbol.ends_with(":USDT") => {
                    let spot = symbol.trim_end_matches(":USDT").to_string();
                    warn!(%symbol, error = %e, fallback = %spot, "invalid symbol, retrying with spot spelling");
                    symbol = spot;
                }
                Err(e @ (ExchangeError::Authentication(_) | ExchangeError::InvalidSymbol(_))) => {
                    warn!(%symbol, %timeframe, error = %e, "fetch failed");
                    return None;
                }
                Err(ExchangeError::Exchange(e)) => {
                    warn!(%symbol, %timeframe, attempt, error = %e, "exchange error, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }

        warn!(%symbol, %timeframe, "retries exhausted");
        None
    }
}

/// Forward-fill, then backward-fill, any non-finite price or volume field so
/// no gaps reach the indicator stage.
pub fn fill_gaps(candles: &mut [Candle]) {
    forward_fill(candles.iter_mut());
    forward_fill(candles.iter_mut().rev());
}

fn forward_fill<'a>(candles: impl Iterator<Item = &'a mut Candle>) {
    let mut prev: Option<Candle> = None;
    for c in candles {
        if let Some(p) = prev {
            if !c.open.is_finite() {
                c.open = p.open;
            }
            if !c.high.is_finite() {
                c.high = p.high;
            }
            if !c.low.is_finite() {
                c.low = p.low;
            }
            if !c.close.is_finite() {
                c.close = p.close;
            }
            if !c.volume.is_finite() {
                c.volume = p.volume;
            }
        }
        prev = Some(*c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Mutex;

    fn candle(close: f64) -> Candle {
        Candle {
            time: 0,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    /// Plays back a scripted sequence of responses and records the symbols
    /// it was called with.
    struct ScriptedExchange {
        responses: Mutex<Vec<Result<Vec<Candle>, ExchangeError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedExchange {
        fn new(responses: Vec<Result<Vec<Candle>, ExchangeError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ExchangeApi for ScriptedExchange {
        fn fetch_ohlcv(
            &self,
            symbol: &str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> impl Future<Output = Result<Vec<Candle>, ExchangeError>> + Send {
            self.calls.lock().unwrap().push(symbol.to_string());
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.is_empty() {
                Err(ExchangeError::Exchange("script exhausted".into()))
            } else {
                responses.remove(0)
            };
            async move { next }
        }
    }

    fn fetcher(exchange: ScriptedExchange) -> MarketDataFetcher<ScriptedExchange> {
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        MarketDataFetcher::new(exchange, limiter, 3, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let f = fetcher(ScriptedExchange::new(vec![Ok(vec![candle(100.0)])]));
        let series = f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await;
        assert_eq!(series.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_network_errors_exhaust_retries() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::Network("timeout".into())),
            Err(ExchangeError::Network("timeout".into())),
            Err(ExchangeError::Network("timeout".into())),
        ]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_none());
        assert_eq!(f.exchange.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::RateLimited),
            Ok(vec![candle(100.0)]),
        ]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_symbol_falls_back_to_spot() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::InvalidSymbol("CONTRACT_NOT_FOUND".into())),
            Ok(vec![candle(100.0)]),
        ]));
        assert!(f.fetch("XYZ/USDT:USDT", Timeframe::OneHour, 100).await.is_some());
        let calls = f.exchange.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), ["XYZ/USDT:USDT", "XYZ/USDT"]);
    }

    #[tokio::test]
    async fn test_invalid_symbol_late_attempt_gives_up() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::Network("timeout".into())),
            Err(ExchangeError::InvalidSymbol("CONTRACT_NOT_FOUND".into())),
        ]));
        assert!(f.fetch("XYZ/USDT:USDT", Timeframe::OneHour, 100).await.is_none());
        assert_eq!(f.exchange.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generic_exchange_error_is_retried() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::Exchange("SERVER_ERROR: please retry".into())),
            Ok(vec![candle(100.0)]),
        ]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_some());
        assert_eq!(f.exchange.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generic_exchange_error_exhausts_retries() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::Exchange("SERVER_ERROR".into())),
            Err(ExchangeError::Exchange("SERVER_ERROR".into())),
            Err(ExchangeError::Exchange("SERVER_ERROR".into())),
        ]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_none());
        assert_eq!(f.exchange.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_series_is_failure() {
        let f = fetcher(ScriptedExchange::new(vec![Ok(vec![])]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_none());
    }

    #[tokio::test]
    async fn test_authentication_error_is_not_retried() {
        let f = fetcher(ScriptedExchange::new(vec![
            Err(ExchangeError::Authentication("bad key".into())),
            Ok(vec![candle(100.0)]),
        ]));
        assert!(f.fetch("BTC/USDT:USDT", Timeframe::OneHour, 100).await.is_none());
        assert_eq!(f.exchange.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fill_gaps_forward_and_backward() {
        let mut candles = vec![candle(f64::NAN), candle(100.0), candle(f64::NAN), candle(102.0)];
        fill_gaps(&mut candles);
        // Leading gap backward-fills, interior gap forward-fills
        assert_eq!(candles[0].close, 100.0);
        assert_eq!(candles[2].close, 100.0);
    }
}
