//! MACD (Moving Average Convergence Divergence).

use crate::types::SignalLabel;

/// MACD line, signal line, and histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Exponential moving average seeded with the first value.
fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    for (i, &v) in values.iter().enumerate() {
        if i == 0 {
            out.push(v);
        } else {
            out.push(alpha * v + (1.0 - alpha) * out[i - 1]);
        }
    }
    out
}

/// MACD over close prices.
///
/// line = EMA(fast) - EMA(slow); signal = EMA(line, signal_period);
/// histogram = line - signal at every index. Series shorter than
/// `slow_period` yield all-zero output instead of failing.
pub fn macd(closes: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdSeries {
    let n = closes.len();
    if n < slow_period {
        return MacdSeries {
            line: vec![0.0; n],
            signal: vec![0.0; n],
            histogram: vec![0.0; n],
        };
    }

    let ema_fast = ema(closes, fast_period);
    let ema_slow = ema(closes, slow_period);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);
    let histogram: Vec<f64> = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

/// Classify the latest two MACD points. First matching case wins.
pub fn macd_signal(series: &MacdSeries) -> SignalLabel {
    let n = series.line.len();
    if n < 2 {
        return SignalLabel::Neutral;
    }

    let macd_now = series.line[n - 1];
    let signal_now = series.signal[n - 1];
    let hist_now = series.histogram[n - 1];
    let macd_prev = series.line[n - 2];
    let signal_prev = series.signal[n - 2];
    let hist_prev = series.histogram[n - 2];

    if macd_now > signal_now && macd_prev <= signal_prev {
        SignalLabel::BullishCrossover
    } else if hist_now > 0.0 && hist_prev <= 0.0 {
        SignalLabel::BullishMomentum
    } else if macd_now > 0.0 && macd_now > signal_now {
        SignalLabel::Bullish
    } else if macd_now < signal_now && macd_prev >= signal_prev {
        SignalLabel::BearishCrossover
    } else if hist_now < 0.0 && hist_prev >= 0.0 {
        SignalLabel::BearishMomentum
    } else if macd_now < 0.0 && macd_now < signal_now {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_insufficient_data_all_zero() {
        let closes = [100.0, 101.0, 102.0];
        let series = macd(&closes, 12, 26, 9);
        assert_eq!(series.line, vec![0.0; 3]);
        assert_eq!(series.signal, vec![0.0; 3]);
        assert_eq!(series.histogram, vec![0.0; 3]);
    }

    #[test]
    fn test_histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 10.0 + i as f64 * 0.2)
            .collect();
        let series = macd(&closes, 12, 26, 9);
        for i in 0..closes.len() {
            let expected = series.line[i] - series.signal[i];
            assert!(
                (series.histogram[i] - expected).abs() < 1e-12,
                "histogram mismatch at {}",
                i
            );
        }
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64 * 2.0).collect();
        let series = macd(&closes, 12, 26, 9);
        assert!(*series.line.last().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_signal_bullish_in_uptrend() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64 * 2.0).collect();
        let series = macd(&closes, 12, 26, 9);
        assert!(macd_signal(&series).is_bullish());
    }

    #[test]
    fn test_macd_signal_bearish_in_downtrend() {
        let closes: Vec<f64> = (0..80).map(|i| 300.0 - i as f64 * 2.0).collect();
        let series = macd(&closes, 12, 26, 9);
        assert!(macd_signal(&series).is_bearish());
    }

    #[test]
    fn test_macd_signal_short_series_neutral() {
        let series = macd(&[100.0], 12, 26, 9);
        assert_eq!(macd_signal(&series), SignalLabel::Neutral);
    }

    #[test]
    fn test_bullish_crossover_detected() {
        // Hand-built series: line crosses above signal at the final point
        let series = MacdSeries {
            line: vec![-1.0, 1.0],
            signal: vec![0.0, 0.0],
            histogram: vec![-1.0, 1.0],
        };
        assert_eq!(macd_signal(&series), SignalLabel::BullishCrossover);
    }

    #[test]
    fn test_bearish_crossover_detected() {
        let series = MacdSeries {
            line: vec![1.0, -1.0],
            signal: vec![0.0, 0.0],
            histogram: vec![1.0, -1.0],
        };
        assert_eq!(macd_signal(&series), SignalLabel::BearishCrossover);
    }

    #[test]
    fn test_bullish_momentum_when_histogram_turns_positive() {
        // Line stays above signal (no crossover) while the histogram flips sign
        let series = MacdSeries {
            line: vec![2.0, 2.5],
            signal: vec![1.0, 2.0],
            histogram: vec![-0.1, 0.5],
        };
        assert_eq!(macd_signal(&series), SignalLabel::BullishMomentum);
    }

    #[test]
    fn test_crossover_wins_over_momentum() {
        // Both the crossover and the histogram-flip conditions hold; the
        // ordered chain reports the crossover
        let series = MacdSeries {
            line: vec![-1.0, 1.0],
            signal: vec![0.0, 0.0],
            histogram: vec![-1.0, 1.0],
        };
        assert_eq!(macd_signal(&series), SignalLabel::BullishCrossover);
    }
}
