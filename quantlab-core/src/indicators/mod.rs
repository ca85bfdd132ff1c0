//! Technical indicators as pure functions over price columns.
//!
//! Every function returns series of exactly the input length. Indices before
//! an indicator's warm-up is complete hold [`UNDEFINED`] (`NaN`), never zero.
//! Malformed parameters fail with a [`ValidationError`] naming the offending
//! parameter; there is no empty or truncated success.
//!
//! All indicators are causal: the value at index `i` depends only on inputs
//! `0..=i`. `tests/lookahead_test.rs` checks this with truncated-vs-full runs.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod cross;
pub mod dmi;
pub mod ema;
pub mod kdj;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod values;
pub mod volume;
pub mod wma;

pub use atr::{atr, true_range, wilder_smooth};
pub use bollinger::{boll, Boll};
pub use cci::cci;
pub use cross::{cross_over, cross_under, crossovers, Signal, SignalKind};
pub use dmi::{dmi, Dmi};
pub use ema::ema;
pub use kdj::{kdj, Kdj};
pub use macd::{macd, Macd};
pub use rsi::rsi;
pub use sma::ma;
pub use values::IndicatorValues;
pub use volume::{obv, vwap};
pub use wma::wma;

use crate::error::ValidationError;

/// Marker for indices where an indicator has no value yet.
pub const UNDEFINED: f64 = f64::NAN;

/// True when `value` is a defined indicator entry.
#[inline]
pub fn is_defined(value: f64) -> bool {
    !value.is_nan()
}

/// The entry at `index`, or `None` when out of range or undefined.
#[inline]
pub fn value_at(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| is_defined(*v))
}

/// Reject `window == 0` and `window > len`.
pub(crate) fn check_window(parameter: &str, window: usize, len: usize) -> Result<(), ValidationError> {
    if window == 0 {
        return Err(ValidationError::new(parameter, "must be >= 1"));
    }
    if window > len {
        return Err(ValidationError::new(
            parameter,
            format!("window {window} exceeds series length {len}"),
        ));
    }
    Ok(())
}

/// Reject columns whose length differs from the first one.
pub(crate) fn check_same_len(columns: &[(&str, &[f64])]) -> Result<usize, ValidationError> {
    let Some((_, first)) = columns.first() else {
        return Ok(0);
    };
    let len = first.len();
    for (name, column) in &columns[1..] {
        if column.len() != len {
            return Err(ValidationError::new(
                *name,
                format!("length {} does not match {len}", column.len()),
            ));
        }
    }
    Ok(len)
}

pub(crate) fn check_non_empty(parameter: &str, len: usize) -> Result<(), ValidationError> {
    if len == 0 {
        return Err(ValidationError::new(parameter, "series must not be empty"));
    }
    Ok(())
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
