//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! First value at index `window` (needs `window` price changes).
//! Edge cases: avg_loss == 0 → RSI = 100 (a flat window included); avg_gain == 0 → RSI = 0.

use super::{check_window, UNDEFINED};
use crate::error::ValidationError;

/// Fails unless `series` holds at least `window + 1` points.
pub fn rsi(series: &[f64], window: usize) -> Result<Vec<f64>, ValidationError> {
    let n = series.len();
    check_window("window", window, n)?;
    if window == n {
        return Err(ValidationError::new(
            "window",
            format!("needs {} points for {window} changes, got {n}", window + 1),
        ));
    }
    let mut result = vec![UNDEFINED; n];

    let changes: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Seed: average gain and average loss over the first `window` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[..window] {
        if ch.is_nan() {
            return Ok(result);
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= window as f64;
    avg_loss /= window as f64;
    result[window] = compute_rsi(avg_gain, avg_loss);

    let alpha = 1.0 / window as f64;
    for i in (window + 1)..n {
        let ch = changes[i - 1];
        if ch.is_nan() {
            return Ok(result);
        }
        let gain = ch.max(0.0);
        let loss = (-ch).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i] = compute_rsi(avg_gain, avg_loss);
    }

    Ok(result)
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        (100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0)
    }
}
