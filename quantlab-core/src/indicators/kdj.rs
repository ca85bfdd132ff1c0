//! KDJ stochastic oscillator.
//!
//! RSV[t] = 100 * (close - lowest_low) / (highest_high - lowest_low) over
//! `window` bars, 50 when the range is flat. K and D are recursive smoothings
//! seeded at window-1; J = 3K - 2D.

use serde::{Deserialize, Serialize};

use super::{check_same_len, check_window, UNDEFINED};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kdj {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

pub fn kdj(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: usize,
    smoothing_k: usize,
    smoothing_d: usize,
) -> Result<Kdj, ValidationError> {
    let n = check_same_len(&[("high", high), ("low", low), ("close", close)])?;
    check_window("window", window, n)?;
    if smoothing_k == 0 {
        return Err(ValidationError::new("smoothing_k", "must be >= 1"));
    }
    if smoothing_d == 0 {
        return Err(ValidationError::new("smoothing_d", "must be >= 1"));
    }

    let m1 = smoothing_k as f64;
    let m2 = smoothing_d as f64;
    let mut k = vec![UNDEFINED; n];
    let mut d = vec![UNDEFINED; n];
    let mut j = vec![UNDEFINED; n];

    for i in (window - 1)..n {
        let start = i + 1 - window;
        let highest = high[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest = low[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let range = highest - lowest;
        let rsv = if range == 0.0 {
            50.0
        } else {
            (close[i] - lowest) / range * 100.0
        };

        if i == window - 1 {
            k[i] = rsv;
            d[i] = rsv;
        } else {
            k[i] = ((m1 - 1.0) * k[i - 1] + rsv) / m1;
            d[i] = ((m2 - 1.0) * d[i - 1] + k[i]) / m2;
        }
        j[i] = 3.0 * k[i] - 2.0 * d[i];
    }

    Ok(Kdj { k, d, j })
}
