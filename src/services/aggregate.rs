//! Overall signal voting from the individual sub-signals.

use crate::types::{OverallSignal, PivotZone, SignalLabel};

/// Combine the six sub-signals and the pivot zone into one overall call.
///
/// Bullish and bearish labels are tallied; base rules require three votes
/// plus zone agreement, and four votes inside the matching zone set escalate
/// to a strong signal. Pure function of its inputs.
///
/// Returns the overall signal with the bull and bear vote counts.
pub fn overall_signal(labels: &[SignalLabel; 6], zone: PivotZone) -> (OverallSignal, u32, u32) {
    let bull_count = labels.iter().filter(|l| l.is_bullish()).count() as u32;
    let bear_count = labels.iter().filter(|l| l.is_bearish()).count() as u32;

    let mut signal = if bull_count >= 3 && zone.is_bullish() {
        OverallSignal::Buy
    } else if bear_count >= 3 && !zone.is_bullish() {
        OverallSignal::Sell
    } else {
        OverallSignal::Neutral
    };

    // Escalations take precedence over the base rules
    if bull_count >= 4 && matches!(zone, PivotZone::ExtremeDiscount | PivotZone::Accumulation) {
        signal = OverallSignal::StrongBuy;
    }
    if bear_count >= 4 && matches!(zone, PivotZone::AboveBuyZone | PivotZone::StrongSupport) {
        signal = OverallSignal::StrongSell;
    }

    (signal, bull_count, bear_count)
}
