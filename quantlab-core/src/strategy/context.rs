//! Read-only view of one bar's decision state.

use crate::domain::Bar;
use crate::indicators::cross::{crosses_at, SignalKind};
use crate::indicators::{is_defined, IndicatorValues};

/// Market state visible to a strategy at bar `index`.
///
/// Bars are truncated to `..=index` and every indicator lookup is bounded
/// the same way, so a strategy cannot read the future even by accident.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    bars: &'a [Bar],
    indicators: &'a IndicatorValues,
    index: usize,
}

impl<'a> BarContext<'a> {
    /// `bars` must hold at least `index + 1` elements; extra bars are cut off.
    pub fn new(bars: &'a [Bar], indicators: &'a IndicatorValues, index: usize) -> Self {
        let end = (index + 1).min(bars.len());
        Self {
            bars: &bars[..end],
            indicators,
            index,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// History up to and including the current bar.
    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn bar(&self) -> Option<&'a Bar> {
        self.bars.last()
    }

    /// Indicator series truncated to the current bar.
    pub fn series(&self, name: &str) -> Option<&'a [f64]> {
        self.indicators
            .get_series(name)
            .map(|s| &s[..(self.index + 1).min(s.len())])
    }

    /// Defined value of `name` at the current bar.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.value_back(name, 0)
    }

    /// Defined value of `name` `back` bars before the current one.
    pub fn value_back(&self, name: &str, back: usize) -> Option<f64> {
        let i = self.index.checked_sub(back)?;
        self.series(name)?.get(i).copied().filter(|v| is_defined(*v))
    }

    /// True when `a` crossed above `b` on the current bar.
    pub fn crossed_over(&self, a: &str, b: &str) -> bool {
        self.crossed(a, b, SignalKind::CrossOver)
    }

    /// True when `a` crossed below `b` on the current bar.
    pub fn crossed_under(&self, a: &str, b: &str) -> bool {
        self.crossed(a, b, SignalKind::CrossUnder)
    }

    fn crossed(&self, a: &str, b: &str, kind: SignalKind) -> bool {
        match (self.series(a), self.series(b)) {
            (Some(sa), Some(sb)) => crosses_at(sa, sb, self.index, kind),
            _ => false,
        }
    }
}
