//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: MA(series, window)
//! - Upper: middle + num_std * stddev(series, window)
//! - Lower: middle - num_std * stddev(series, window)
//!
//! Uses sample stddev (divide by N-1); a single-bar window has zero width.
//! First defined value at index window-1.

use serde::{Deserialize, Serialize};

use super::sma::rolling_mean;
use super::{check_window, UNDEFINED};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boll {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn boll(series: &[f64], window: usize, num_std: f64) -> Result<Boll, ValidationError> {
    let n = series.len();
    check_window("window", window, n)?;
    if !num_std.is_finite() || num_std < 0.0 {
        return Err(ValidationError::new(
            "num_std",
            format!("must be finite and >= 0, got {num_std}"),
        ));
    }

    let middle = rolling_mean(series, window);
    let mut upper = vec![UNDEFINED; n];
    let mut lower = vec![UNDEFINED; n];

    for i in (window - 1)..n {
        let mean = middle[i];
        if mean.is_nan() {
            continue;
        }
        let std = if window == 1 {
            0.0
        } else {
            let ss: f64 = series[i + 1 - window..=i]
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum();
            (ss / (window - 1) as f64).sqrt()
        };
        upper[i] = mean + num_std * std;
        lower[i] = mean - num_std * std;
    }

    Ok(Boll {
        upper,
        middle,
        lower,
    })
}
