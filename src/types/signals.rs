use serde::{Deserialize, Serialize};

/// Label produced by a single indicator.
///
/// Stored and transmitted as the bare semantic value; any icon decoration
/// happens in the presentation layer (notifications, dashboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalLabel {
    Bullish,
    BullishCrossover,
    BullishMomentum,
    Neutral,
    Bearish,
    BearishCrossover,
    BearishMomentum,
}

impl SignalLabel {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::Bullish => "Bullish",
            SignalLabel::BullishCrossover => "Bullish Crossover",
            SignalLabel::BullishMomentum => "Bullish Momentum",
            SignalLabel::Neutral => "Neutral",
            SignalLabel::Bearish => "Bearish",
            SignalLabel::BearishCrossover => "Bearish Crossover",
            SignalLabel::BearishMomentum => "Bearish Momentum",
        }
    }

    /// Parse from a stored display label.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Bullish" => Some(SignalLabel::Bullish),
            "Bullish Crossover" => Some(SignalLabel::BullishCrossover),
            "Bullish Momentum" => Some(SignalLabel::BullishMomentum),
            "Neutral" => Some(SignalLabel::Neutral),
            "Bearish" => Some(SignalLabel::Bearish),
            "Bearish Crossover" => Some(SignalLabel::BearishCrossover),
            "Bearish Momentum" => Some(SignalLabel::BearishMomentum),
            _ => None,
        }
    }

    /// Whether this label counts toward the bullish vote.
    pub fn is_bullish(&self) -> bool {
        matches!(
            self,
            SignalLabel::Bullish | SignalLabel::BullishCrossover | SignalLabel::BullishMomentum
        )
    }

    /// Whether this label counts toward the bearish vote.
    pub fn is_bearish(&self) -> bool {
        matches!(
            self,
            SignalLabel::Bearish | SignalLabel::BearishCrossover | SignalLabel::BearishMomentum
        )
    }
}

impl std::fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall composite call for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallSignal {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl OverallSignal {
    /// Display label matching the stored row format.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallSignal::StrongBuy => "STRONG BUY",
            OverallSignal::Buy => "BUY",
            OverallSignal::Neutral => "NEUTRAL",
            OverallSignal::Sell => "SELL",
            OverallSignal::StrongSell => "STRONG SELL",
        }
    }

    /// Parse from a stored display label.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STRONG BUY" => Some(OverallSignal::StrongBuy),
            "BUY" => Some(OverallSignal::Buy),
            "NEUTRAL" => Some(OverallSignal::Neutral),
            "SELL" => Some(OverallSignal::Sell),
            "STRONG SELL" => Some(OverallSignal::StrongSell),
            _ => None,
        }
    }

    /// True for STRONG BUY / STRONG SELL.
    pub fn is_strong(&self) -> bool {
        matches!(self, OverallSignal::StrongBuy | OverallSignal::StrongSell)
    }
}

impl std::fmt::Display for OverallSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational RSI band.
///
/// Distinct from the bull/bear RSI vote, which uses 40/60 thresholds only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Oversold,
    Undervalued,
    Neutral,
    Overvalued,
    Overbought,
}

impl RsiZone {
    /// Classify an RSI value into its band.
    pub fn from_value(rsi: f64) -> Self {
        if rsi < 30.0 {
            RsiZone::Oversold
        } else if rsi < 40.0 {
            RsiZone::Undervalued
        } else if rsi < 60.0 {
            RsiZone::Neutral
        } else if rsi < 70.0 {
            RsiZone::Overvalued
        } else {
            RsiZone::Overbought
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RsiZone::Oversold => "Oversold",
            RsiZone::Undervalued => "Undervalued",
            RsiZone::Neutral => "Neutral",
            RsiZone::Overvalued => "Overvalued",
            RsiZone::Overbought => "Overbought",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Oversold" => Some(RsiZone::Oversold),
            "Undervalued" => Some(RsiZone::Undervalued),
            "Neutral" => Some(RsiZone::Neutral),
            "Overvalued" => Some(RsiZone::Overvalued),
            "Overbought" => Some(RsiZone::Overbought),
            _ => None,
        }
    }
}

/// Pivot zone for the current price, derived from the daily high-low range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotZone {
    ExtremeDiscount,
    Accumulation,
    Reversal,
    StrongSupport,
    AboveBuyZone,
}

impl PivotZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            PivotZone::ExtremeDiscount => "Extreme Discount",
            PivotZone::Accumulation => "Accumulation Zone",
            PivotZone::Reversal => "Reversal Zone",
            PivotZone::StrongSupport => "Strong Support",
            PivotZone::AboveBuyZone => "Above Buy Zone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Extreme Discount" => Some(PivotZone::ExtremeDiscount),
            "Accumulation Zone" => Some(PivotZone::Accumulation),
            "Reversal Zone" => Some(PivotZone::Reversal),
            "Strong Support" => Some(PivotZone::StrongSupport),
            "Above Buy Zone" => Some(PivotZone::AboveBuyZone),
            _ => None,
        }
    }

    /// Whether the zone biases the overall call toward buying.
    pub fn is_bullish(&self) -> bool {
        matches!(self, PivotZone::ExtremeDiscount | PivotZone::Accumulation)
    }

    /// Zone bias as a sub-signal for the aggregator.
    ///
    /// Bullish only for discount/accumulation, bearish only for the two
    /// upper zones, neutral for the reversal band in between.
    pub fn bias(&self) -> SignalLabel {
        match self {
            PivotZone::ExtremeDiscount | PivotZone::Accumulation => SignalLabel::Bullish,
            PivotZone::Reversal => SignalLabel::Neutral,
            PivotZone::StrongSupport | PivotZone::AboveBuyZone => SignalLabel::Bearish,
        }
    }
}

impl std::fmt::Display for PivotZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complete derived signal for one symbol, one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    pub symbol: String,
    pub current_price: f64,
    /// 1-hour polynomial regression trend.
    pub poly_1h_signal: SignalLabel,
    /// Fibonacci position from the 1-hour range.
    pub fib_1h_signal: SignalLabel,
    /// Fibonacci vote used by the aggregator (same levels as fib_1h_signal).
    pub fib_signal: SignalLabel,
    /// Daily polynomial regression trend.
    pub poly_signal: SignalLabel,
    /// RSI vote at 40/60 thresholds.
    pub rsi_signal: SignalLabel,
    /// Informational RSI band.
    pub rsi_zone: RsiZone,
    pub rsi_value: f64,
    pub macd_signal: SignalLabel,
    /// Zone bias vote.
    pub pivot_signal: SignalLabel,
    pub pivot_zone: PivotZone,
    pub overall_signal: OverallSignal,
    pub bull_count: usize,
    pub bear_count: usize,
    pub forecast_1h: f64,
    pub forecast_1d: f64,
    pub forecast_7d: f64,
    pub forecast_14d: f64,
    pub forecast_30d: f64,
    /// Formatted "%Y-%m-%d %H:%M:%S" UTC, matching the stored schema.
    pub timestamp: String,
}

/// Singleton run metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub last_updated: String,
    /// Symbols that produced a signal this run.
    pub total_symbols: i64,
    pub status: String,
    pub duration_seconds: f64,
    pub data_source: String,
}
