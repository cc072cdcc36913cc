//! Polynomial regression trend fitting and price forecasting.

use crate::types::{Candle, SignalLabel};

/// A fitted polynomial and its forward projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionForecast {
    /// Coefficients in ascending order: c0 + c1*x + c2*x^2 + ...
    pub coeffs: Vec<f64>,
    /// Projected closes for the next `periods` bar indices.
    pub forecast: Vec<f64>,
}

impl RegressionForecast {
    /// The linear coefficient, used as the slope proxy for trend strength.
    pub fn slope(&self) -> f64 {
        self.coeffs.get(1).copied().unwrap_or(0.0)
    }

    /// Evaluate the fitted polynomial at bar index x.
    pub fn eval(&self, x: f64) -> f64 {
        // Horner's method
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Fit quality metrics for a polynomial regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    /// Fraction of variance explained, clamped to [0, 1].
    pub r_squared: f64,
    /// r_squared scaled to [0, 100].
    pub confidence: f64,
    /// min(100, |slope| * 1000). A slope-magnitude heuristic kept for
    /// compatibility with the stored history; not a normalized statistic.
    pub trend_strength: f64,
}

/// Least-squares polynomial fit of close price against bar index, projected
/// `periods` bars forward.
///
/// Requires at least `degree + 1` bars and at least two distinct close
/// values. Forecast values are floored at 10% of the last observed close so
/// a diverging fit never projects a collapse to zero or below.
pub fn polynomial_forecast(closes: &[f64], degree: usize, periods: usize) -> Option<RegressionForecast> {
    let n = closes.len();
    if n < degree + 1 {
        return None;
    }

    let first = closes[0];
    if !closes.iter().any(|&y| y != first) {
        return None;
    }

    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let coeffs = polyfit(&xs, closes, degree)?;

    let floor = closes[n - 1] * 0.1;
    let fitted = RegressionForecast {
        coeffs,
        forecast: Vec::new(),
    };
    let forecast: Vec<f64> = (n..n + periods)
        .map(|x| fitted.eval(x as f64).max(floor))
        .collect();

    Some(RegressionForecast {
        coeffs: fitted.coeffs,
        forecast,
    })
}

/// R-squared, confidence, and the trend-strength heuristic for a fit.
///
/// SS_tot is treated as 1 for a single-point series to avoid dividing by
/// zero; a zero SS_tot likewise yields r_squared = 0.
pub fn regression_metrics(closes: &[f64], fit: &RegressionForecast) -> RegressionMetrics {
    let n = closes.len();
    let mean = closes.iter().sum::<f64>() / n.max(1) as f64;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, &y) in closes.iter().enumerate() {
        let y_pred = fit.eval(i as f64);
        ss_res += (y - y_pred).powi(2);
        ss_tot += (y - mean).powi(2);
    }
    if n <= 1 {
        ss_tot = 1.0;
    }

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    RegressionMetrics {
        r_squared,
        confidence: (r_squared * 100.0).clamp(0.0, 100.0),
        trend_strength: (fit.slope().abs() * 1000.0).min(100.0),
    }
}

/// Trend vote from the hourly series: forecast five bars ahead and compare
/// the first projected close against the current price at a 0.5% threshold.
///
/// Returns the label and the one-hour forecast (current price when the fit
/// is unavailable).
pub fn hourly_trend_signal(closes: &[f64], current_price: f64) -> (SignalLabel, f64) {
    match polynomial_forecast(closes, 3, 5) {
        Some(fit) if !fit.forecast.is_empty() => {
            let forecast_1 = fit.forecast[0];
            let change_pct = (forecast_1 - current_price) / current_price * 100.0;
            let label = if change_pct > 0.5 {
                SignalLabel::Bullish
            } else if change_pct < -0.5 {
                SignalLabel::Bearish
            } else {
                SignalLabel::Neutral
            };
            (label, forecast_1)
        }
        _ => (SignalLabel::Neutral, current_price),
    }
}

/// Trend vote from the daily forecast at a 1% threshold.
pub fn daily_trend_signal(forecast_1d: f64, current_price: f64) -> SignalLabel {
    let change_pct = (forecast_1d - current_price) / current_price * 100.0;
    if change_pct > 1.0 {
        SignalLabel::Bullish
    } else if change_pct < -1.0 {
        SignalLabel::Bearish
    } else {
        SignalLabel::Neutral
    }
}

/// Support/resistance from the last 20 bars (whole series if shorter).
///
/// If the extremes invert, resistance is forced to support * 1.05.
pub fn support_resistance(candles: &[Candle]) -> (f64, f64) {
    let window = if candles.len() > 20 {
        &candles[candles.len() - 20..]
    } else {
        candles
    };

    let support = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let mut resistance = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    if support >= resistance {
        resistance = support * 1.05;
    }
    (support, resistance)
}

/// Least-squares polynomial fit via the normal equations.
///
/// Returns coefficients in ascending order, or None if the system is
/// singular (degenerate inputs).
fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let m = degree + 1;

    // Power sums for the Vandermonde normal matrix
    let mut sums = vec![0.0; 2 * degree + 1];
    for &x in xs {
        let mut p = 1.0;
        for s in sums.iter_mut() {
            *s += p;
            p *= x;
        }
    }

    // Augmented matrix [A | b]
    let mut aug = vec![vec![0.0; m + 1]; m];
    for (r, row) in aug.iter_mut().enumerate() {
        for c in 0..m {
            row[c] = sums[r + c];
        }
    }
    for (&x, &y) in xs.iter().zip(ys) {
        let mut p = 1.0;
        for row in aug.iter_mut() {
            row[m] += p * y;
            p *= x;
        }
    }

    // Gaussian elimination with partial pivoting
    for col in 0..m {
        let pivot = (col..m).max_by(|&a, &b| {
            aug[a][col]
                .abs()
                .partial_cmp(&aug[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[pivot][col].abs() < 1e-12 {
            return None;
        }
        aug.swap(col, pivot);

        for row in (col + 1)..m {
            let factor = aug[row][col] / aug[col][col];
            for c in col..=m {
                aug[row][c] -= factor * aug[col][c];
            }
        }
    }

    let mut coeffs = vec![0.0; m];
    for row in (0..m).rev() {
        let mut acc = aug[row][m];
        for c in (row + 1)..m {
            acc -= aug[row][c] * coeffs[c];
        }
        coeffs[row] = acc / aug[row][row];
    }

    Some(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64) -> Candle {
        Candle {
            time: 0,
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 1.0,
        }
    }

    #[test]
    fn test_polyfit_recovers_line() {
        let closes: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64).collect();
        let fit = polynomial_forecast(&closes, 3, 5).unwrap();
        // c1 ~ 2, higher orders ~ 0 (within normal-equation roundoff)
        assert!((fit.slope() - 2.0).abs() < 1e-3, "slope: {}", fit.slope());
        // Forecast continues the line
        assert!((fit.forecast[0] - 110.0).abs() < 1e-2);
    }

    #[test]
    fn test_forecast_floor() {
        // Steep collapse: a cubic fit projects far below zero without the floor
        let closes: Vec<f64> = (0..20).map(|i| 10_000.0 - (i as f64).powi(3)).collect();
        let last = *closes.last().unwrap();
        let fit = polynomial_forecast(&closes, 3, 30).unwrap();
        for v in &fit.forecast {
            assert!(*v >= last * 0.1 - 1e-9, "forecast below floor: {}", v);
        }
    }

    #[test]
    fn test_insufficient_data_returns_none() {
        assert!(polynomial_forecast(&[100.0, 101.0, 102.0], 3, 5).is_none());
    }

    #[test]
    fn test_constant_series_returns_none() {
        let closes = vec![100.0; 30];
        assert!(polynomial_forecast(&closes, 3, 5).is_none());
    }

    #[test]
    fn test_metrics_perfect_fit() {
        let closes: Vec<f64> = (0..40).map(|i| 5.0 + 0.5 * i as f64).collect();
        let fit = polynomial_forecast(&closes, 3, 1).unwrap();
        let metrics = regression_metrics(&closes, &fit);
        assert!(metrics.r_squared > 0.999);
        assert!(metrics.confidence > 99.9);
        // |0.5| * 1000 caps at 100
        assert_eq!(metrics.trend_strength, 100.0);
    }

    #[test]
    fn test_metrics_bounds() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 1.3).sin() * 20.0)
            .collect();
        let fit = polynomial_forecast(&closes, 3, 1).unwrap();
        let metrics = regression_metrics(&closes, &fit);
        assert!((0.0..=1.0).contains(&metrics.r_squared));
        assert!((0.0..=100.0).contains(&metrics.confidence));
        assert!((0.0..=100.0).contains(&metrics.trend_strength));
    }

    #[test]
    fn test_hourly_trend_labels() {
        let up: Vec<f64> = (0..50).map(|i| 100.0 + 2.0 * i as f64).collect();
        let (label, forecast) = hourly_trend_signal(&up, *up.last().unwrap());
        assert_eq!(label, SignalLabel::Bullish);
        assert!(forecast > *up.last().unwrap());

        let down: Vec<f64> = (0..50).map(|i| 300.0 - 2.0 * i as f64).collect();
        let (label, _) = hourly_trend_signal(&down, *down.last().unwrap());
        assert_eq!(label, SignalLabel::Bearish);

        // Too short to fit: neutral with the current price as forecast
        let (label, forecast) = hourly_trend_signal(&[100.0, 101.0], 100.5);
        assert_eq!(label, SignalLabel::Neutral);
        assert_eq!(forecast, 100.5);
    }

    #[test]
    fn test_daily_trend_threshold() {
        assert_eq!(daily_trend_signal(102.0, 100.0), SignalLabel::Bullish);
        assert_eq!(daily_trend_signal(100.5, 100.0), SignalLabel::Neutral);
        assert_eq!(daily_trend_signal(98.0, 100.0), SignalLabel::Bearish);
    }

    #[test]
    fn test_support_resistance_window() {
        let mut candles: Vec<Candle> = (0..30).map(|i| candle(100.0 + i as f64, 90.0 + i as f64)).collect();
        let (support, resistance) = support_resistance(&candles);
        // Only the last 20 bars count
        assert_eq!(support, 100.0);
        assert_eq!(resistance, 129.0);

        // Inverted extremes force resistance = support * 1.05
        candles.truncate(1);
        candles[0] = Candle {
            time: 0,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1.0,
        };
        let (support, resistance) = support_resistance(&candles);
        assert_eq!(support, 100.0);
        assert!((resistance - 105.0).abs() < 1e-9);
    }
}
