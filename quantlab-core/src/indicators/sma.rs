//! Simple Moving Average (MA).
//!
//! Rolling mean over a lookback window.
//! First defined value at index window-1.

use super::{check_window, UNDEFINED};
use crate::error::ValidationError;

pub fn ma(series: &[f64], window: usize) -> Result<Vec<f64>, ValidationError> {
    check_window("window", window, series.len())?;
    Ok(rolling_mean(series, window))
}

/// Rolling mean without parameter checks. A NaN anywhere in the window makes
/// that entry undefined.
pub(crate) fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![UNDEFINED; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &entering) in series.iter().enumerate() {
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }
        if i >= window {
            let leaving = series[i - window];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= window && nan_count == 0 {
            result[i] = sum / window as f64;
        }
    }

    result
}
