//! Bar and PriceSeries — the fundamental market data units.

use std::ops::Range;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// OHLCV bar for one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Typical price: (high + low + close) / 3.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// True when every OHLCV field is finite.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Basic OHLC sanity check: high is the top of the range, low the bottom.
    pub fn is_sane(&self) -> bool {
        self.is_finite()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= 0.0
    }
}

/// Ordered, validated sequence of bars.
///
/// Timestamps are strictly increasing and every OHLCV field is finite.
/// The series is immutable once built; slicing produces an independent copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<Bar>) -> Result<Self, ValidationError> {
        for (i, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(ValidationError::new(
                    "bars",
                    format!("bar {i} has a non-finite field"),
                ));
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                return Err(ValidationError::new(
                    "bars",
                    format!(
                        "timestamps must be strictly increasing (bar {i}: {} <= {})",
                        bar.timestamp,
                        bars[i - 1].timestamp
                    ),
                ));
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Copy the bars in `range` (clamped to the series) into a new series.
    pub fn slice(&self, range: Range<usize>) -> PriceSeries {
        let end = range.end.min(self.bars.len());
        let start = range.start.min(end);
        PriceSeries {
            bars: self.bars[start..end].to_vec(),
        }
    }
}

impl TryFrom<Vec<Bar>> for PriceSeries {
    type Error = ValidationError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Self::new(bars)
    }
}

impl From<PriceSeries> for Vec<Bar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn bar_at(day: i64, close: f64) -> Bar {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Bar {
            timestamp: base + Duration::days(day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(bar_at(0, 100.0).is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = bar_at(0, 100.0);
        bar.high = 90.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn series_rejects_unordered_timestamps() {
        let err = PriceSeries::new(vec![bar_at(1, 10.0), bar_at(0, 11.0)]).unwrap_err();
        assert_eq!(err.parameter, "bars");
    }

    #[test]
    fn series_rejects_duplicate_timestamps() {
        assert!(PriceSeries::new(vec![bar_at(0, 10.0), bar_at(0, 11.0)]).is_err());
    }

    #[test]
    fn series_rejects_nan() {
        let mut bar = bar_at(0, 10.0);
        bar.close = f64::NAN;
        assert!(PriceSeries::new(vec![bar]).is_err());
    }

    #[test]
    fn slice_is_clamped() {
        let series = PriceSeries::new((0..5).map(|i| bar_at(i, 10.0 + i as f64)).collect())
            .unwrap();
        let sliced = series.slice(2..100);
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.closes(), vec![12.0, 13.0, 14.0]);
        assert!(series.slice(7..9).is_empty());
    }

    #[test]
    fn deserialization_validates() {
        let bars = vec![bar_at(1, 10.0), bar_at(0, 11.0)];
        let json = serde_json::to_string(&bars).unwrap();
        assert!(serde_json::from_str::<PriceSeries>(&json).is_err());
    }
}
