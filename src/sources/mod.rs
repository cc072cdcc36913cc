//! Exchange connectivity.

pub mod gateio;

pub use gateio::GateIoClient;

use crate::error::ExchangeError;
use crate::types::{Candle, Timeframe};
use std::future::Future;

/// Exchange collaborator: fetch an ordered OHLCV series.
///
/// Implemented by [`GateIoClient`] in production and by mocks in tests.
pub trait ExchangeApi: Send + Sync {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Candle>, ExchangeError>> + Send;
}
