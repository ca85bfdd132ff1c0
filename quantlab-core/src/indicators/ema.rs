//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (window + 1).
//! Seed: EMA[window-1] = SMA of the first `window` values.

use super::{check_window, UNDEFINED};
use crate::error::ValidationError;

pub fn ema(series: &[f64], window: usize) -> Result<Vec<f64>, ValidationError> {
    check_window("window", window, series.len())?;
    Ok(ema_of_series(series, window))
}

/// EMA of an arbitrary series that may start with undefined entries.
///
/// Leading NaNs are skipped; the seed is the mean of the first `period`
/// values after them. A NaN after the seed taints everything that follows.
/// Used by composed indicators (MACD's DEA line).
pub(crate) fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![UNDEFINED; n];

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    if period == 0 || n - start < period {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);

    let seed_window = &values[start..start + period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed = seed_window.iter().sum::<f64>() / period as f64;
    let seed_index = start + period - 1;
    result[seed_index] = seed;

    let mut prev = seed;
    for i in (seed_index + 1)..n {
        if values[i].is_nan() {
            return result;
        }
        let next = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = next;
        prev = next;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, ma, DEFAULT_EPSILON};

    #[test]
    fn ema_window_1_equals_input() {
        let result = ema(&[100.0, 200.0, 300.0], 1).unwrap();
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5; seed at 2 = mean(10,11,12) = 11
        // EMA[3] = 0.5*13 + 0.5*11 = 12, EMA[4] = 0.5*14 + 0.5*12 = 13
        let result = ema(&[10.0, 11.0, 12.0, 13.0, 14.0], 3).unwrap();
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_seed_matches_ma() {
        let closes = [3.0, 7.0, 2.0, 9.0, 4.0, 8.0];
        let e = ema(&closes, 4).unwrap();
        let m = ma(&closes, 4).unwrap();
        assert_approx(e[3], m[3], DEFAULT_EPSILON);
    }

    #[test]
    fn ema_of_series_skips_leading_nan() {
        let values = [f64::NAN, f64::NAN, 2.0, 4.0, 6.0];
        let result = ema_of_series(&values, 2);
        assert!(result[2].is_nan());
        assert_approx(result[3], 3.0, DEFAULT_EPSILON);
        // alpha = 2/3: 2/3*6 + 1/3*3 = 5
        assert_approx(result[4], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_after_seed_propagates() {
        let result = ema(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3).unwrap();
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_rejects_bad_window() {
        assert!(ema(&[1.0, 2.0], 0).is_err());
        assert!(ema(&[1.0, 2.0], 3).is_err());
    }
}
