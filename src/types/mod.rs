//! Core data types shared across the pipeline.

mod candle;
mod signals;

pub use candle::{closes, highest_high, lowest_low, Candle, Timeframe};
pub use signals::{
    OverallSignal, PivotZone, RsiZone, RunMetadata, SignalLabel, TradingSignal,
};
