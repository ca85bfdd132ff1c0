//! Weighted Moving Average (WMA).
//!
//! Linear weights 1..=window, oldest to newest.

use super::{check_window, UNDEFINED};
use crate::error::ValidationError;

pub fn wma(series: &[f64], window: usize) -> Result<Vec<f64>, ValidationError> {
    check_window("window", window, series.len())?;

    let weight_sum = (window * (window + 1)) as f64 / 2.0;
    let mut result = vec![UNDEFINED; series.len()];
    for i in (window - 1)..series.len() {
        let slice = &series[i + 1 - window..=i];
        let weighted: f64 = slice
            .iter()
            .enumerate()
            .map(|(k, v)| (k + 1) as f64 * v)
            .sum();
        result[i] = weighted / weight_sum;
    }
    Ok(result)
}
