//! Volume-based indicators: OBV and cumulative VWAP.

use super::{check_non_empty, check_same_len, UNDEFINED};
use crate::error::ValidationError;

/// On-Balance Volume: add volume on up closes, subtract on down closes.
/// obv[0] = volume[0].
pub fn obv(close: &[f64], volume: &[f64]) -> Result<Vec<f64>, ValidationError> {
    let n = check_same_len(&[("close", close), ("volume", volume)])?;
    check_non_empty("close", n)?;

    let mut result = Vec::with_capacity(n);
    let mut running = volume[0];
    result.push(running);
    for i in 1..n {
        if close[i] > close[i - 1] {
            running += volume[i];
        } else if close[i] < close[i - 1] {
            running -= volume[i];
        }
        result.push(running);
    }
    Ok(result)
}

/// Cumulative volume-weighted typical price. Undefined while no volume has
/// traded.
pub fn vwap(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
) -> Result<Vec<f64>, ValidationError> {
    let n = check_same_len(&[
        ("high", high),
        ("low", low),
        ("close", close),
        ("volume", volume),
    ])?;
    check_non_empty("close", n)?;

    let mut result = vec![UNDEFINED; n];
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    for i in 0..n {
        let tp = (high[i] + low[i] + close[i]) / 3.0;
        cum_pv += tp * volume[i];
        cum_vol += volume[i];
        if cum_vol != 0.0 {
            result[i] = cum_pv / cum_vol;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn obv_accumulates_by_direction() {
        let close = [10.0, 11.0, 11.0, 9.0];
        let volume = [100.0, 50.0, 70.0, 30.0];
        assert_eq!(obv(&close, &volume).unwrap(), vec![100.0, 150.0, 150.0, 120.0]);
    }

    #[test]
    fn obv_rejects_empty() {
        assert!(obv(&[], &[]).is_err());
    }

    #[test]
    fn vwap_weights_by_volume() {
        let p1 = [10.0, 20.0];
        let volume = [0.0, 1.0];
        let result = vwap(&p1, &p1, &p1, &volume).unwrap();
        assert!(result[0].is_nan());
        assert_approx(result[1], 20.0, DEFAULT_EPSILON);

        let result = vwap(&p1, &p1, &p1, &[1.0, 3.0]).unwrap();
        assert_approx(result[1], (10.0 + 60.0) / 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn vwap_rejects_mismatch() {
        let a = [1.0, 2.0];
        assert_eq!(vwap(&a, &a, &a, &[1.0]).unwrap_err().parameter, "volume");
    }
}
