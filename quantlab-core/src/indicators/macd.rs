//! MACD (Moving Average Convergence Divergence).
//!
//! dif  = EMA(fast) - EMA(slow)
//! dea  = EMA(dif, signal), seeded on the first `signal` defined dif values
//! hist = 2 * (dif - dea)

use serde::{Deserialize, Serialize};

use super::check_window;
use super::ema::ema_of_series;
use crate::error::ValidationError;

/// The three MACD lines, aligned with the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    pub hist: Vec<f64>,
}

pub fn macd(
    series: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Result<Macd, ValidationError> {
    let n = series.len();
    check_window("fast", fast, n)?;
    check_window("slow", slow, n)?;
    check_window("signal", signal, n)?;
    // dif starts at max(fast, slow) - 1; dea needs `signal` of those.
    let needed = fast.max(slow) + signal - 1;
    if needed > n {
        return Err(ValidationError::new(
            "signal",
            format!("dea needs {needed} points, series has {n}"),
        ));
    }

    let fast_line = ema_of_series(series, fast);
    let slow_line = ema_of_series(series, slow);
    // NaN - x is NaN, so dif is undefined until both EMAs are seeded.
    let dif: Vec<f64> = fast_line
        .iter()
        .zip(&slow_line)
        .map(|(f, s)| f - s)
        .collect();
    let dea = ema_of_series(&dif, signal);
    let hist = dif
        .iter()
        .zip(&dea)
        .map(|(d, e)| 2.0 * (d - e))
        .collect();

    Ok(Macd { dif, dea, hist })
}
