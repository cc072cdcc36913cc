//! Relative Strength Index (RSI).

use crate::types::SignalLabel;

/// RSI over close prices with a rolling average-gain/average-loss window.
///
/// Returns one value per input point. Points before the window has filled,
/// series shorter than `period + 1`, and zero-loss windows all map to the
/// neutral value 50. Output is clipped to [0, 100].
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    if n < period + 1 {
        return vec![50.0; n];
    }

    let mut out = vec![50.0; n];
    for i in period..n {
        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        for j in (i - period + 1)..=i {
            let change = closes[j] - closes[j - 1];
            if change > 0.0 {
                gain_sum += change;
            } else {
                loss_sum += -change;
            }
        }

        let avg_gain = gain_sum / period as f64;
        let avg_loss = loss_sum / period as f64;

        out[i] = if avg_loss == 0.0 {
            50.0
        } else {
            let rs = avg_gain / avg_loss;
            (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
        };
    }

    out
}

/// RSI vote for the aggregator: bullish below 40, bearish above 60.
///
/// Distinct from [`crate::types::RsiZone`], which is the informational
/// five-band label.
pub fn rsi_signal(value: f64) -> SignalLabel {
    if value < 40.0 {
        SignalLabel::Bullish
    } else if value > 60.0 {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_insufficient_data_is_constant_neutral() {
        // 5 closes with period 14 -> constant 50
        let closes = [100.0, 101.0, 99.0, 102.0, 98.0];
        let values = rsi(&closes, 14);
        assert_eq!(values.len(), 5);
        assert!(values.iter().all(|&v| v == 50.0));
    }

    #[test]
    fn test_rsi_bounded() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        for v in rsi(&closes, 14) {
            assert!((0.0..=100.0).contains(&v), "RSI out of range: {}", v);
        }
    }

    #[test]
    fn test_rsi_uptrend_high() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&closes, 14);
        // Monotonic gains: zero loss maps to neutral by convention
        assert_eq!(*values.last().unwrap(), 50.0);

        // Mostly-up with occasional down closes should read strongly overbought
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + i as f64 * 2.0 - if i % 5 == 0 { 3.0 } else { 0.0 })
            .collect();
        let values = rsi(&closes, 14);
        assert!(*values.last().unwrap() > 70.0);
    }

    #[test]
    fn test_rsi_downtrend_low() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 200.0 - i as f64 * 2.0 + if i % 5 == 0 { 3.0 } else { 0.0 })
            .collect();
        let values = rsi(&closes, 14);
        assert!(*values.last().unwrap() < 30.0);
    }

    #[test]
    fn test_rsi_leading_points_neutral() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&closes, 14);
        for v in values.iter().take(14) {
            assert_eq!(*v, 50.0);
        }
    }

    #[test]
    fn test_rsi_signal_thresholds() {
        assert_eq!(rsi_signal(35.0), SignalLabel::Bullish);
        assert_eq!(rsi_signal(40.0), SignalLabel::Neutral);
        assert_eq!(rsi_signal(50.0), SignalLabel::Neutral);
        assert_eq!(rsi_signal(60.0), SignalLabel::Neutral);
        assert_eq!(rsi_signal(65.0), SignalLabel::Bearish);
    }
}
