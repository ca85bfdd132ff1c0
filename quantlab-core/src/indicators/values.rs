//! Precomputed indicator values container.
//!
//! A strategy fills one of these once per run, before the bar loop. The
//! simulator owns it for the duration of that run and hands strategies a
//! read-only view bounded to the current bar.

use std::collections::HashMap;

use super::{Boll, Kdj, Macd};

#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Insert the MACD lines as `{prefix}.dif`, `{prefix}.dea`, `{prefix}.hist`.
    pub fn insert_macd(&mut self, prefix: &str, macd: Macd) {
        self.insert(format!("{prefix}.dif"), macd.dif);
        self.insert(format!("{prefix}.dea"), macd.dea);
        self.insert(format!("{prefix}.hist"), macd.hist);
    }

    pub fn insert_kdj(&mut self, prefix: &str, kdj: Kdj) {
        self.insert(format!("{prefix}.k"), kdj.k);
        self.insert(format!("{prefix}.d"), kdj.d);
        self.insert(format!("{prefix}.j"), kdj.j);
    }

    pub fn insert_boll(&mut self, prefix: &str, boll: Boll) {
        self.insert(format!("{prefix}.upper"), boll.upper);
        self.insert(format!("{prefix}.middle"), boll.middle);
        self.insert(format!("{prefix}.lower"), boll.lower);
    }

    /// Raw value at a bar index, `NaN` included. `None` when the name is
    /// unknown or the index is out of bounds.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
    }

    /// Get the full series for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Name of the first series (alphabetically) whose length differs from
    /// `expected`.
    pub fn misaligned(&self, expected: usize) -> Option<&str> {
        let mut names: Vec<&String> = self.series.keys().collect();
        names.sort();
        names
            .into_iter()
            .find(|name| self.series[*name].len() != expected)
            .map(|name| name.as_str())
    }
}
