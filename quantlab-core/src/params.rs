//! Strongly-typed strategy parameters.
//!
//! `ParameterRange` describes one tunable axis and is validated at
//! construction. `ParameterSet` is one concrete assignment of values and is
//! usable as a map key: two sets are equal only when every name and every
//! value bit pattern match.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Upper bound on the number of candidate values one range may expand to.
pub const MAX_RANGE_VALUES: usize = 1_000_000;

/// Inclusive range `[min, max]` stepped by `step` over one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterRange")]
pub struct ParameterRange {
    name: String,
    min: f64,
    max: f64,
    step: f64,
    continuous: bool,
}

#[derive(Deserialize)]
struct RawParameterRange {
    name: String,
    min: f64,
    max: f64,
    step: f64,
    #[serde(default)]
    continuous: bool,
}

impl TryFrom<RawParameterRange> for ParameterRange {
    type Error = ValidationError;

    fn try_from(raw: RawParameterRange) -> Result<Self, Self::Error> {
        let range = ParameterRange::new(raw.name, raw.min, raw.max, raw.step)?;
        Ok(range.with_continuous(raw.continuous))
    }
}

impl ParameterRange {
    /// Build a discrete range. Fails unless `min <= max`, `step > 0` and all
    /// bounds are finite.
    pub fn new(
        name: impl Into<String>,
        min: f64,
        max: f64,
        step: f64,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::new("name", "parameter name must not be empty"));
        }
        if !min.is_finite() || !max.is_finite() || !step.is_finite() {
            return Err(ValidationError::new(
                name,
                "min, max and step must be finite",
            ));
        }
        if min > max {
            return Err(ValidationError::new(
                name,
                format!("min ({min}) must be <= max ({max})"),
            ));
        }
        if step <= 0.0 {
            return Err(ValidationError::new(
                name,
                format!("step ({step}) must be > 0"),
            ));
        }
        let range = Self {
            name,
            min,
            max,
            step,
            continuous: false,
        };
        let count = range.len();
        if count > MAX_RANGE_VALUES {
            return Err(ValidationError::new(
                range.name,
                format!("expands to {count} values (limit {MAX_RANGE_VALUES})"),
            ));
        }
        Ok(range)
    }

    /// Mark the range as continuous: random search samples uniformly from
    /// `[min, max]` instead of the stepped grid.
    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Number of stepped candidate values.
    pub fn len(&self) -> usize {
        let tolerance = self.step * 1e-9;
        ((self.max - self.min + tolerance) / self.step).floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Candidate values: `min, min + step, ...`, never above `max`.
    ///
    /// Values are computed as `min + k * step` rather than by accumulation so
    /// float drift cannot add or drop a candidate.
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|k| (self.min + k as f64 * self.step).min(self.max))
            .collect()
    }
}

/// One concrete assignment of values to a strategy's parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, f64>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value for `name`, or `default` when absent.
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Integer window/period value for `name`, or `default` when absent.
    ///
    /// Fails when the stored value is negative, non-finite, or not integral.
    pub fn period_or(&self, name: &str, default: usize) -> Result<usize, ValidationError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => to_period(name, v),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Stable content hash, used as an id in reports.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (name, value) in &self.values {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
            hasher.update(&canonical_bits(*value).to_le_bytes());
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}

fn to_period(name: &str, value: f64) -> Result<usize, ValidationError> {
    if !value.is_finite() || value < 0.0 || (value - value.round()).abs() > 1e-9 {
        return Err(ValidationError::new(
            name,
            format!("expected a non-negative integer, got {value}"),
        ));
    }
    Ok(value.round() as usize)
}

/// Bit pattern with `-0.0` folded into `0.0` and all NaNs folded together.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 {
        0.0_f64.to_bits()
    } else if value.is_nan() {
        f64::NAN.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for ParameterSet {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && canonical_bits(*va) == canonical_bits(*vb))
    }
}

impl Eq for ParameterSet {}

impl Hash for ParameterSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.len().hash(state);
        for (name, value) in &self.values {
            name.hash(state);
            canonical_bits(*value).hash(state);
        }
    }
}

impl PartialOrd for ParameterSet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParameterSet {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let lhs = self.values.iter().map(|(k, v)| (k, canonical_bits(*v)));
        let rhs = other.values.iter().map(|(k, v)| (k, canonical_bits(*v)));
        for ((ka, va), (kb, vb)) in lhs.zip(rhs) {
            let ord = ka
                .cmp(kb)
                .then_with(|| f64::from_bits(va).total_cmp(&f64::from_bits(vb)));
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        self.values.len().cmp(&other.values.len())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.values {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn range_expands_inclusive() {
        let range = ParameterRange::new("fast", 5.0, 15.0, 5.0).unwrap();
        assert_eq!(range.values(), vec![5.0, 10.0, 15.0]);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn range_caps_at_max() {
        let range = ParameterRange::new("slow", 20.0, 35.0, 10.0).unwrap();
        assert_eq!(range.values(), vec![20.0, 30.0]);
    }

    #[test]
    fn range_resists_float_drift() {
        let range = ParameterRange::new("std", 0.1, 0.3, 0.1).unwrap();
        let values = range.values();
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| *v <= 0.3));
    }

    #[test]
    fn range_single_value() {
        let range = ParameterRange::new("n", 9.0, 9.0, 1.0).unwrap();
        assert_eq!(range.values(), vec![9.0]);
    }

    #[test]
    fn range_rejects_bad_bounds() {
        assert_eq!(
            ParameterRange::new("fast", 10.0, 5.0, 1.0).unwrap_err().parameter,
            "fast"
        );
        assert!(ParameterRange::new("fast", 1.0, 5.0, 0.0).is_err());
        assert!(ParameterRange::new("fast", 1.0, 5.0, -1.0).is_err());
        assert!(ParameterRange::new("fast", f64::NAN, 5.0, 1.0).is_err());
        assert!(ParameterRange::new("", 1.0, 5.0, 1.0).is_err());
        assert!(ParameterRange::new("huge", 0.0, 1e12, 1.0).is_err());
    }

    #[test]
    fn range_deserialization_validates() {
        let ok: ParameterRange =
            serde_json::from_str(r#"{"name":"fast","min":5,"max":15,"step":5}"#).unwrap();
        assert_eq!(ok.values(), vec![5.0, 10.0, 15.0]);
        assert!(!ok.is_continuous());
        let bad = serde_json::from_str::<ParameterRange>(
            r#"{"name":"fast","min":15,"max":5,"step":5}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn sets_distinguish_values() {
        let a = ParameterSet::new().with("fast", 5.0).with("slow", 20.0);
        let b = ParameterSet::new().with("slow", 20.0).with("fast", 5.0);
        let c = ParameterSet::new().with("fast", 5.0).with("slow", 30.0);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<ParameterSet> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }

    #[test]
    fn negative_zero_is_zero() {
        let a = ParameterSet::new().with("x", 0.0);
        let b = ParameterSet::new().with("x", -0.0);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn period_accessor_validates() {
        let set = ParameterSet::new().with("fast", 5.0).with("bad", 2.5);
        assert_eq!(set.period_or("fast", 1).unwrap(), 5);
        assert_eq!(set.period_or("missing", 7).unwrap(), 7);
        assert_eq!(set.period_or("bad", 1).unwrap_err().parameter, "bad");
    }

    #[test]
    fn display_lists_pairs() {
        let set = ParameterSet::new().with("slow", 20.0).with("fast", 5.0);
        assert_eq!(set.to_string(), "fast=5, slow=20");
    }
}
