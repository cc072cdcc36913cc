//! Vigil - composite trading signal generation for Gate.io markets
//!
//! Fetches multi-timeframe OHLCV series, computes RSI, MACD, Fibonacci,
//! pivot-zone, and polynomial-regression sub-signals, aggregates them into
//! one overall call per symbol, and persists everything to SQLite on an
//! hourly cadence.

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;
