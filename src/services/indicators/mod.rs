//! Technical indicator computations over candle series.

pub mod fibonacci;
pub mod macd;
pub mod regression;
pub mod rsi;

pub use fibonacci::{fibonacci_levels, fibonacci_signal, FibLevels};
pub use macd::{macd, macd_signal, MacdSeries};
pub use regression::{
    daily_trend_signal, hourly_trend_signal, polynomial_forecast, regression_metrics,
    support_resistance, RegressionForecast, RegressionMetrics,
};
pub use rsi::{rsi, rsi_signal};
