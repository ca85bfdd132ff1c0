//! DMI: directional movement index with ADX (Wilder).
//!
//! Steps:
//! 1. +DM and -DM from consecutive bars (0 on the first bar)
//! 2. Smooth +DM, -DM and TR with Wilder smoothing (alpha = 1/window)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! +DI/-DI are defined from index window-1, ADX from 2*window-2.
//! A window with zero true range yields DI = 0 and DX = 0.

use serde::{Deserialize, Serialize};

use super::atr::{true_range, wilder_smooth};
use super::{check_same_len, check_window, UNDEFINED};
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dmi {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

pub fn dmi(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    window: usize,
) -> Result<Dmi, ValidationError> {
    let n = check_same_len(&[("high", high), ("low", low), ("close", close)])?;
    check_window("window", window, n)?;

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];
        if up_move.is_nan() || down_move.is_nan() {
            plus_dm[i] = UNDEFINED;
            minus_dm[i] = UNDEFINED;
            continue;
        }
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    let smooth_tr = wilder_smooth(&true_range(high, low, close), window);
    let smooth_plus = wilder_smooth(&plus_dm, window);
    let smooth_minus = wilder_smooth(&minus_dm, window);

    let mut plus_di = vec![UNDEFINED; n];
    let mut minus_di = vec![UNDEFINED; n];
    let mut dx = vec![UNDEFINED; n];
    for i in 0..n {
        let (tr, p, m) = (smooth_tr[i], smooth_plus[i], smooth_minus[i]);
        if tr.is_nan() || p.is_nan() || m.is_nan() {
            continue;
        }
        let (pdi, mdi) = if tr == 0.0 {
            (0.0, 0.0)
        } else {
            (100.0 * p / tr, 100.0 * m / tr)
        };
        plus_di[i] = pdi;
        minus_di[i] = mdi;
        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }

    let adx = wilder_smooth(&dx, window);

    Ok(Dmi {
        plus_di,
        minus_di,
        adx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    fn trending(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let close: Vec<f64> = (0..n).map(|i| 100.0 + 2.0 * i as f64).collect();
        let high = close.iter().map(|c| c + 1.0).collect();
        let low = close.iter().map(|c| c - 1.0).collect();
        (high, low, close)
    }

    #[test]
    fn warmup_lengths() {
        let (h, l, c) = trending(20);
        let r = dmi(&h, &l, &c, 5).unwrap();
        assert!(r.plus_di[3].is_nan());
        assert!(!r.plus_di[4].is_nan());
        assert!(r.adx[7].is_nan());
        assert!(!r.adx[8].is_nan());
    }

    #[test]
    fn uptrend_has_dominant_plus_di() {
        let (h, l, c) = trending(30);
        let r = dmi(&h, &l, &c, 5).unwrap();
        for i in 10..30 {
            assert!(r.plus_di[i] > r.minus_di[i]);
            assert!((0.0..=100.0).contains(&r.adx[i]));
        }
        assert_approx(r.minus_di[29], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_market_is_zero() {
        let flat = vec![10.0; 12];
        let r = dmi(&flat, &flat, &flat, 3).unwrap();
        assert_approx(r.plus_di[5], 0.0, DEFAULT_EPSILON);
        assert_approx(r.adx[11], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn dmi_rejects_bad_window() {
        let (h, l, c) = trending(4);
        assert!(dmi(&h, &l, &c, 0).is_err());
        assert!(dmi(&h, &l, &c, 5).is_err());
    }
}
