//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (EMA with alpha = 1/window), seeded with the
//! mean of TR[0..window] at index window-1.

use super::{check_same_len, check_window, UNDEFINED};
use crate::error::ValidationError;

pub fn atr(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: usize,
) -> Result<Vec<f64>, ValidationError> {
    let n = check_same_len(&[("high", high), ("low", low), ("close", close)])?;
    check_window("window", window, n)?;
    Ok(wilder_smooth(&true_range(high, low, close), window))
}

/// True Range series. TR[0] = high[0] - low[0] (no previous close).
///
/// Callers pass equal-length columns.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![UNDEFINED; n];
    if n == 0 {
        return tr;
    }

    tr[0] = high[0] - low[0];
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    // f64::max ignores a single NaN operand; restore propagation.
    for i in 0..n {
        if high[i].is_nan() || low[i].is_nan() || (i > 0 && close[i - 1].is_nan()) {
            tr[i] = UNDEFINED;
        }
    }

    tr
}

/// Wilder smoothing, alpha = 1/period.
///
/// Seed: mean of the first run of `period` consecutive defined values, placed
/// at the last index of that run. A NaN after the seed taints the rest.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![UNDEFINED; n];
    if period == 0 || n < period {
        return result;
    }

    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                seed_end = Some(i);
                break;
            }
        }
    }
    let Some(seed_end) = seed_end else {
        return result;
    };

    let seed = values[seed_end + 1 - period..=seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in (seed_end + 1)..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}
