//! Per-symbol signal generation and the hourly run loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::services::aggregate::overall_signal;
use crate::services::fetcher::MarketDataFetcher;
use crate::services::indicators::{
    daily_trend_signal, fibonacci_levels, fibonacci_signal, hourly_trend_signal, macd,
    macd_signal, polynomial_forecast, regression_metrics, rsi, rsi_signal, support_resistance,
    RegressionMetrics,
};
use crate::services::limiter::RateLimiter;
use crate::services::notify::{format_summary_message, TelegramNotifier};
use crate::services::pivot::PivotLevels;
use crate::services::store::{ForecastRow, RegressionRow, SignalDb};
use crate::sources::ExchangeApi;
use crate::types::{closes, highest_high, lowest_low, RunMetadata, Timeframe, TradingSignal};

const CANDLE_LIMIT: usize = 100;
const RSI_PERIOD: usize = 14;
const REGRESSION_DEGREE: usize = 3;
const DAILY_FORECAST_PERIODS: usize = 30;
const RUN_INTERVAL_SECS: f64 = 3600.0;

/// Outcome of one full pass over the symbol universe.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub strong: Vec<TradingSignal>,
    pub duration_seconds: f64,
}

/// Drives fetch, indicator computation, aggregation, and persistence for the
/// configured symbol universe.
pub struct SignalGenerator<E> {
    fetcher: MarketDataFetcher<E>,
    db: Arc<SignalDb>,
    notifier: Option<TelegramNotifier>,
    symbols: Vec<String>,
    symbol_budget: Duration,
    max_concurrency: usize,
}

impl<E: ExchangeApi + 'static> SignalGenerator<E> {
    pub fn new(exchange: E, db: Arc<SignalDb>, config: &Config) -> Self {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(
            config.fetch.request_interval_ms,
        )));
        let fetcher = MarketDataFetcher::new(
            exchange,
            limiter,
            config.fetch.max_retries,
            Duration::from_secs(config.fetch.retry_delay_secs),
        );
        let notifier = config.telegram.as_ref().map(TelegramNotifier::new);

        Self {
            fetcher,
            db,
            notifier,
            symbols: config.symbols.clone(),
            symbol_budget: Duration::from_secs(config.fetch.symbol_budget_secs),
            max_concurrency: config.fetch.max_concurrency.max(1),
        }
    }

    /// Fetch, compute, and persist the signal for one symbol.
    ///
    /// Missing hourly or daily data skips the symbol. A missing 4h series
    /// degrades to the hourly series and processing continues. Persistence
    /// failures are logged and do not discard the computed signal.
    pub async fn generate_signal(&self, symbol: &str) -> Option<TradingSignal> {
        let hourly = self.fetcher.fetch(symbol, Timeframe::OneHour, CANDLE_LIMIT).await?;
        let daily = self.fetcher.fetch(symbol, Timeframe::OneDay, CANDLE_LIMIT).await?;
        let four_hour = match self.fetcher.fetch(symbol, Timeframe::FourHour, CANDLE_LIMIT).await {
            Some(series) => series,
            None => {
                warn!(%symbol, "4h series unavailable, substituting hourly");
                hourly.clone()
            }
        };
        let closes_1h = closes(&hourly);
        let closes_4h = closes(&four_hour);
        let closes_1d = closes(&daily);
        let current_price = *closes_1d.last()?;

        // RSI and MACD from the 4h series
        let rsi_series = rsi(&closes_4h, RSI_PERIOD);
        let rsi_value = *rsi_series.last()?;
        let rsi_label = rsi_signal(rsi_value);
        let macd_series = macd(&closes_4h, 12, 26, 9);
        let macd_label = macd_signal(&macd_series);

        // Fibonacci from the hourly range
        let fib_levels = fibonacci_levels(highest_high(&hourly), lowest_low(&hourly));
        let fib_label = fibonacci_signal(current_price, &fib_levels);

        // Regression trends
        let (poly_1h_label, forecast_1h) = hourly_trend_signal(&closes_1h, current_price);
        let daily_fit = polynomial_forecast(&closes_1d, REGRESSION_DEGREE, DAILY_FORECAST_PERIODS);
        let (forecasts, metrics, poly_label, slope) = match &daily_fit {
            Some(fit) => {
                let metrics = regression_metrics(&closes_1d, fit);
                let at = |day: usize| fit.forecast.get(day - 1).copied().unwrap_or(current_price);
                let forecasts = [at(1), at(7), at(14), at(30)];
                let label = daily_trend_signal(forecasts[0], current_price);
                (forecasts, metrics, label, fit.slope())
            }
            None => {
                debug!(%symbol, "daily regression unavailable, holding forecasts flat");
                let flat = [current_price; 4];
                let metrics = RegressionMetrics {
                    r_squared: 0.0,
                    confidence: 0.0,
                    trend_strength: 0.0,
                };
                (flat, metrics, crate::types::SignalLabel::Neutral, 0.0)
            }
        };
        let [forecast_1d, forecast_7d, forecast_14d, forecast_30d] = forecasts;

        // Pivot zone from the daily range
        let pivot_levels = PivotLevels::from_daily(&daily);
        let pivot_zone = pivot_levels.classify(current_price);
        let pivot_label = pivot_zone.bias();

        let labels = [poly_1h_label, fib_label, poly_label, rsi_label, macd_label, pivot_label];
        let (overall, bull_count, bear_count) = overall_signal(&labels, pivot_zone);

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let signal = TradingSignal {
            symbol: symbol.to_string(),
            current_price,
            poly_1h_signal: poly_1h_label,
            fib_1h_signal: fib_label,
            fib_signal: fib_label,
            poly_signal: poly_label,
            rsi_signal: rsi_label,
            rsi_zone: crate::types::RsiZone::from_value(rsi_value),
            rsi_value,
            macd_signal: macd_label,
            pivot_signal: pivot_label,
            pivot_zone,
            overall_signal: overall,
            bull_count: bull_count as usize,
            bear_count: bear_count as usize,
            forecast_1h,
            forecast_1d,
            forecast_7d,
            forecast_14d,
            forecast_30d,
            timestamp: timestamp.clone(),
        };

        let (support, resistance) = support_resistance(&daily);
        self.persist(&signal, &fib_levels, &metrics, slope, support, resistance);

        info!(
            %symbol,
            signal = overall.as_str(),
            price = current_price,
            bulls = bull_count,
            bears = bear_count,
            "signal generated"
        );
        Some(signal)
    }

    fn persist(
        &self,
        signal: &TradingSignal,
        fib_levels: &crate::services::indicators::FibLevels,
        metrics: &RegressionMetrics,
        slope: f64,
        support: f64,
        resistance: f64,
    ) {
        if let Err(e) = self.db.save_fibonacci(
            &signal.symbol,
            &signal.timestamp,
            signal.current_price,
            fib_levels,
            signal.fib_1h_signal,
            signal.pivot_zone,
        ) {
            error!(symbol = %signal.symbol, error = %e, "failed to save fibonacci row");
        }

        let regression_row = RegressionRow {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp.clone(),
            current_price: signal.current_price,
            slope,
            r_squared: metrics.r_squared,
            confidence: metrics.confidence,
            trend_strength: metrics.trend_strength,
            signal: signal.poly_signal,
            support,
            resistance,
            forecast_1d: signal.forecast_1d,
            forecast_7d: signal.forecast_7d,
            forecast_30d: signal.forecast_30d,
        };
        if let Err(e) = self.db.save_regression(&regression_row) {
            error!(symbol = %signal.symbol, error = %e, "failed to save regression row");
        }

        let forecast_row = ForecastRow {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp.clone(),
            current_price: signal.current_price,
            forecast_1h: signal.forecast_1h,
            forecast_1d: signal.forecast_1d,
            forecast_7d: signal.forecast_7d,
            forecast_14d: signal.forecast_14d,
            forecast_30d: signal.forecast_30d,
            signal: signal.overall_signal,
        };
        if let Err(e) = self.db.save_forecast(&forecast_row) {
            error!(symbol = %signal.symbol, error = %e, "failed to save forecast row");
        }

        if let Err(e) = self.db.save_trading_signal(signal) {
            error!(symbol = %signal.symbol, error = %e, "failed to save trading signal");
        }
    }

    /// One pass over every configured symbol.
    ///
    /// Symbols run on a bounded worker pool behind the shared request rate
    /// limiter; each stays atomic (its own fetch, compute, and persist) and
    /// runs under a wall-clock budget so one stall cannot push the run past
    /// its hour. The metadata row records the outcome either way; status is
    /// "success" when at least one symbol produced a signal.
    pub async fn run_once(self: Arc<Self>) -> RunSummary {
        let started = Instant::now();
        let attempted = self.symbols.len();
        let mut succeeded = 0usize;
        let mut strong = Vec::new();

        info!(symbols = attempted, workers = self.max_concurrency, "starting signal run");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();
        for symbol in self.symbols.clone() {
            let generator = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (symbol, None),
                };
                let budget = generator.symbol_budget;
                match tokio::time::timeout(budget, generator.generate_signal(&symbol)).await {
                    Ok(result) => (symbol, result),
                    Err(_) => {
                        warn!(%symbol, budget_secs = budget.as_secs(), "symbol budget exceeded, skipping");
                        (symbol, None)
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Some(signal))) => {
                    succeeded += 1;
                    if signal.overall_signal.is_strong() {
                        strong.push(signal);
                    }
                }
                Ok((symbol, None)) => {
                    warn!(%symbol, "no signal produced, skipping");
                }
                Err(e) => {
                    error!(error = %e, "symbol task failed");
                }
            }
        }

        for signal in &strong {
            if let Some(notifier) = &self.notifier {
                notifier.send_signal(signal).await;
            }
        }

        let duration_seconds = started.elapsed().as_secs_f64();
        let status = if succeeded > 0 { "success" } else { "failed" };
        let metadata = RunMetadata {
            last_updated: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_symbols: succeeded as i64,
            status: status.to_string(),
            duration_seconds,
            data_source: "gateio".to_string(),
        };
        if let Err(e) = self.db.update_metadata(&metadata) {
            error!(error = %e, "failed to update run metadata");
        }

        let summary = RunSummary {
            attempted,
            succeeded,
            strong,
            duration_seconds,
        };

        // Summary message only when there is something actionable in it
        if !summary.strong.is_empty() {
            if let Some(notifier) = &self.notifier {
                let text = format_summary_message(
                    summary.succeeded,
                    summary.attempted,
                    &summary.strong,
                    summary.duration_seconds,
                );
                notifier.send(&text).await;
            }
        }

        info!(
            succeeded = summary.succeeded,
            attempted = summary.attempted,
            strong = summary.strong.len(),
            duration_secs = format!("{:.0}", summary.duration_seconds),
            "signal run complete"
        );
        summary
    }

    /// Run hourly until interrupted.
    ///
    /// Each iteration sleeps out the remainder of the hour after the run;
    /// an interrupt during either phase exits cleanly between writes.
    pub async fn run_scheduled(self: Arc<Self>) {
        loop {
            let summary = tokio::select! {
                summary = Arc::clone(&self).run_once() => summary,
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, stopping");
                    break;
                }
            };

            let sleep_secs = (RUN_INTERVAL_SECS - summary.duration_seconds).max(0.0);
            info!(sleep_secs = format!("{:.0}", sleep_secs), "sleeping until next run");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs_f64(sleep_secs)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::error::ExchangeError;
    use crate::types::Candle;
    use std::future::Future;

    fn test_config(symbols: &[&str]) -> Config {
        Config {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            telegram: None,
            database_path: ":memory:".to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            fetch: FetchConfig {
                max_retries: 3,
                retry_delay_secs: 0,
                request_interval_ms: 0,
                symbol_budget_secs: 120,
                max_concurrency: 2,
            },
        }
    }

    fn trending_candles(start: f64, step: f64, n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                Candle {
                    time: i as i64 * 3_600_000,
                    open: close - step,
                    high: close + start * 0.01,
                    low: close - start * 0.01,
                    close,
                    volume: 10.0,
                }
            })
            .collect()
    }

    /// Serves the same synthetic series for every timeframe.
    struct StubExchange {
        candles: Vec<Candle>,
    }

    impl ExchangeApi for StubExchange {
        fn fetch_ohlcv(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> impl Future<Output = Result<Vec<Candle>, ExchangeError>> + Send {
            let candles = self.candles.clone();
            async move { Ok(candles) }
        }
    }

    /// Always fails with a network error.
    struct DownExchange;

    impl ExchangeApi for DownExchange {
        fn fetch_ohlcv(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> impl Future<Output = Result<Vec<Candle>, ExchangeError>> + Send {
            async { Err(ExchangeError::Network("connection refused".into())) }
        }
    }

    #[tokio::test]
    async fn test_generate_signal_persists_all_tables() {
        let db = Arc::new(SignalDb::new_in_memory().unwrap());
        let config = test_config(&["BTC/USDT:USDT"]);
        let exchange = StubExchange {
            candles: trending_candles(100.0, 0.5, 100),
        };
        let generator = SignalGenerator::new(exchange, db.clone(), &config);

        let signal = generator.generate_signal("BTC/USDT:USDT").await.unwrap();
        assert_eq!(signal.symbol, "BTC/USDT:USDT");
        assert!(signal.current_price > 0.0);

        assert!(db.latest_signal("BTC/USDT:USDT").is_some());
        assert_eq!(db.fibonacci_count("BTC/USDT:USDT"), 1);
        assert_eq!(db.regression_count("BTC/USDT:USDT"), 1);
        assert_eq!(db.forecast_count("BTC/USDT:USDT"), 1);
    }

    #[tokio::test]
    async fn test_uptrend_votes_bullish() {
        let db = Arc::new(SignalDb::new_in_memory().unwrap());
        let config = test_config(&["BTC/USDT:USDT"]);
        let exchange = StubExchange {
            candles: trending_candles(100.0, 2.0, 100),
        };
        let generator = SignalGenerator::new(exchange, db, &config);

        let signal = generator.generate_signal("BTC/USDT:USDT").await.unwrap();
        assert!(signal.bull_count >= signal.bear_count);
        assert!(signal.poly_1h_signal.is_bullish());
    }

    #[tokio::test]
    async fn test_unreachable_exchange_skips_symbol() {
        let db = Arc::new(SignalDb::new_in_memory().unwrap());
        let config = test_config(&["BTC/USDT:USDT"]);
        let generator = SignalGenerator::new(DownExchange, db.clone(), &config);

        assert!(generator.generate_signal("BTC/USDT:USDT").await.is_none());
        assert!(db.latest_signal("BTC/USDT:USDT").is_none());
    }

    #[tokio::test]
    async fn test_run_once_counts_and_metadata() {
        let db = Arc::new(SignalDb::new_in_memory().unwrap());
        let config = test_config(&["BTC/USDT:USDT", "ETH/USDT:USDT"]);
        let exchange = StubExchange {
            candles: trending_candles(100.0, 0.5, 100),
        };
        let generator = Arc::new(SignalGenerator::new(exchange, db.clone(), &config));

        let summary = generator.run_once().await;
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 2);

        let metadata = db.metadata().unwrap();
        assert_eq!(metadata.total_symbols, 2);
        assert_eq!(metadata.status, "success");
        assert_eq!(metadata.data_source, "gateio");
    }

    #[tokio::test]
    async fn test_run_once_all_failed_sets_failed_status() {
        let db = Arc::new(SignalDb::new_in_memory().unwrap());
        let config = test_config(&["BTC/USDT:USDT", "ETH/USDT:USDT"]);
        let generator = Arc::new(SignalGenerator::new(DownExchange, db.clone(), &config));

        let summary = generator.run_once().await;
        assert_eq!(summary.succeeded, 0);

        let metadata = db.metadata().unwrap();
        assert_eq!(metadata.total_symbols, 0);
        assert_eq!(metadata.status, "failed");
    }
}
