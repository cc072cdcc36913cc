//! Pivot-zone classification over the recent daily range.

use crate::types::{highest_high, lowest_low, Candle, PivotZone};

/// Zone boundaries derived from the recent daily high/low range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub recent_low: f64,
    pub recent_high: f64,
    /// recent_low + 10% of range
    pub extreme_discount: f64,
    /// recent_low + 30% of range
    pub accumulation: f64,
    /// recent_low + 50% of range
    pub reversal: f64,
    /// recent_low + 70% of range
    pub strong_support: f64,
}

impl PivotLevels {
    /// Build zone boundaries from the last 20 daily bars (the whole series
    /// if shorter). A flat or inverted range is widened to 5% above the low
    /// so every boundary stays distinct.
    pub fn from_daily(candles: &[Candle]) -> Self {
        let window = if candles.len() > 20 {
            &candles[candles.len() - 20..]
        } else {
            candles
        };

        let recent_low = lowest_low(window);
        let mut recent_high = highest_high(window);
        if recent_high <= recent_low {
            recent_high = recent_low * 1.05;
        }
        let range = recent_high - recent_low;

        Self {
            recent_low,
            recent_high,
            extreme_discount: recent_low + range * 0.10,
            accumulation: recent_low + range * 0.30,
            reversal: recent_low + range * 0.50,
            strong_support: recent_low + range * 0.70,
        }
    }

    /// First matching zone, checked from the bottom of the range up.
    pub fn classify(&self, price: f64) -> PivotZone {
        if price <= self.extreme_discount {
            PivotZone::ExtremeDiscount
        } else if price <= self.accumulation {
            PivotZone::Accumulation
        } else if price <= self.reversal {
            PivotZone::Reversal
        } else if price <= self.strong_support {
            PivotZone::StrongSupport
        } else {
            PivotZone::AboveBuyZone
        }
    }
}
