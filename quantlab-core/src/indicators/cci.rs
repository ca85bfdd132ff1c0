//! Commodity Channel Index (CCI).
//!
//! CCI = (tp - MA(tp)) / (0.015 * mean_abs_dev), tp = (high + low + close) / 3.
//! Zero when the window has no deviation.

use super::sma::rolling_mean;
use super::{check_same_len, check_window, UNDEFINED};
use crate::error::ValidationError;

const LAMBERT_CONSTANT: f64 = 0.015;

pub fn cci(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: usize,
) -> Result<Vec<f64>, ValidationError> {
    let n = check_same_len(&[("high", high), ("low", low), ("close", close)])?;
    check_window("window", window, n)?;

    let tp: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let mean = rolling_mean(&tp, window);
    let mut result = vec![UNDEFINED; n];

    for i in (window - 1)..n {
        if mean[i].is_nan() {
            continue;
        }
        let mad = tp[i + 1 - window..=i]
            .iter()
            .map(|v| (v - mean[i]).abs())
            .sum::<f64>()
            / window as f64;
        result[i] = if mad == 0.0 {
            0.0
        } else {
            (tp[i] - mean[i]) / (LAMBERT_CONSTANT * mad)
        };
    }

    Ok(result)
}
