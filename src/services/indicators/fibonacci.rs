//! Fibonacci retracement and extension levels.

use crate::types::SignalLabel;

/// The 11 named levels derived from one high/low pair.
///
/// Retracements walk down from the high; extensions project below the low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevels {
    pub level_0: f64,
    pub level_23_6: f64,
    pub level_38_2: f64,
    pub level_50: f64,
    pub level_61_8: f64,
    pub level_78_6: f64,
    pub level_100: f64,
    pub level_127_2: f64,
    pub level_161_8: f64,
    pub level_261_8: f64,
    pub level_423_6: f64,
}

impl FibLevels {
    /// Retracement levels in factor order, for monotonicity checks.
    pub fn retracements(&self) -> [f64; 7] {
        [
            self.level_0,
            self.level_23_6,
            self.level_38_2,
            self.level_50,
            self.level_61_8,
            self.level_78_6,
            self.level_100,
        ]
    }
}

/// Compute the level set from a high/low pair.
///
/// A degenerate range (high <= low) is corrected to high = low * 1.01 before
/// computing, so levels never invert.
pub fn fibonacci_levels(high: f64, low: f64) -> FibLevels {
    let high = if high <= low { low * 1.01 } else { high };
    let diff = high - low;

    FibLevels {
        level_0: high,
        level_23_6: high - diff * 0.236,
        level_38_2: high - diff * 0.382,
        level_50: high - diff * 0.5,
        level_61_8: high - diff * 0.618,
        level_78_6: high - diff * 0.786,
        level_100: low,
        level_127_2: low - diff * 0.272,
        level_161_8: low - diff * 0.618,
        level_261_8: low - diff * 1.618,
        level_423_6: low - diff * 3.236,
    }
}

/// Position of the current price within the retracement band.
pub fn fibonacci_signal(price: f64, levels: &FibLevels) -> SignalLabel {
    if price > levels.level_61_8 {
        SignalLabel::Bullish
    } else if price < levels.level_38_2 {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}
