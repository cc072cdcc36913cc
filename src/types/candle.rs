use serde::{Deserialize, Serialize};

/// One OHLCV price bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, Unix timestamp in milliseconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle timeframe used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    OneHour,
    FourHour,
    OneDay,
}

impl Timeframe {
    /// Interval string as the exchange API expects it.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::FourHour => "4h",
            Timeframe::OneDay => "1d",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.interval())
    }
}

/// Extract the close column from a candle series.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Highest high across a series. Returns NAN on an empty slice.
pub fn highest_high(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.high).fold(f64::NAN, f64::max)
}

/// Lowest low across a series. Returns NAN on an empty slice.
pub fn lowest_low(candles: &[Candle]) -> f64 {
    candles.iter().map(|c| c.low).fold(f64::NAN, f64::min)
}
