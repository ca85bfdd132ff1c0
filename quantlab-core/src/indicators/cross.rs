//! Crossover detection between two aligned series.

use serde::{Deserialize, Serialize};

use super::{check_same_len, is_defined};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// `a` moved from at-or-below `b` to strictly above it.
    CrossOver,
    /// `a` moved from at-or-above `b` to strictly below it.
    CrossUnder,
}

/// A crossover event at bar `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    pub index: usize,
    pub kind: SignalKind,
}

pub fn cross_over(a: &[f64], b: &[f64]) -> Result<Vec<Signal>, ValidationError> {
    scan(a, b, SignalKind::CrossOver)
}

pub fn cross_under(a: &[f64], b: &[f64]) -> Result<Vec<Signal>, ValidationError> {
    scan(a, b, SignalKind::CrossUnder)
}

/// Both directions merged, ordered by index.
pub fn crossovers(a: &[f64], b: &[f64]) -> Result<Vec<Signal>, ValidationError> {
    let mut all = cross_over(a, b)?;
    all.extend(cross_under(a, b)?);
    all.sort_by_key(|s| s.index);
    Ok(all)
}

/// True when `kind` fires at `i`. All four operands must be defined.
pub(crate) fn crosses_at(a: &[f64], b: &[f64], i: usize, kind: SignalKind) -> bool {
    if i == 0 || i >= a.len() || i >= b.len() {
        return false;
    }
    let (a0, a1, b0, b1) = (a[i - 1], a[i], b[i - 1], b[i]);
    if !(is_defined(a0) && is_defined(a1) && is_defined(b0) && is_defined(b1)) {
        return false;
    }
    match kind {
        SignalKind::CrossOver => a0 <= b0 && a1 > b1,
        SignalKind::CrossUnder => a0 >= b0 && a1 < b1,
    }
}

fn scan(a: &[f64], b: &[f64], kind: SignalKind) -> Result<Vec<Signal>, ValidationError> {
    let n = check_same_len(&[("a", a), ("b", b)])?;
    Ok((1..n)
        .filter(|&i| crosses_at(a, b, i, kind))
        .map(|index| Signal { index, kind })
        .collect())
}
