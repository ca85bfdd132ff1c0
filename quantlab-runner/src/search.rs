//! Candidate generation for grid and random search.
//!
//! Both generators run on the calling thread before anything is dispatched,
//! so the candidate list is independent of the worker count.

use std::collections::HashSet;

use quantlab_core::{ParameterRange, ParameterSet, ValidationError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest grid the optimizer will enumerate.
pub const MAX_GRID_SIZE: usize = 10_000_000;

/// Reject an empty range list or duplicate range names.
pub fn check_ranges(ranges: &[ParameterRange]) -> Result<(), ValidationError> {
    if ranges.is_empty() {
        return Err(ValidationError::new("ranges", "at least one range is required"));
    }
    let mut seen = HashSet::new();
    for range in ranges {
        if !seen.insert(range.name()) {
            return Err(ValidationError::new(
                "ranges",
                format!("duplicate range name `{}`", range.name()),
            ));
        }
    }
    Ok(())
}

/// Number of sets the grid over `ranges` contains.
pub fn grid_size(ranges: &[ParameterRange]) -> Result<usize, ValidationError> {
    ranges.iter().try_fold(1usize, |acc, r| {
        acc.checked_mul(r.len())
            .filter(|n| *n <= MAX_GRID_SIZE)
            .ok_or_else(|| {
                ValidationError::new(
                    "ranges",
                    format!("grid exceeds {MAX_GRID_SIZE} parameter sets"),
                )
            })
    })
}

/// Cartesian product in range order, last range varying fastest.
pub fn grid_candidates(ranges: &[ParameterRange]) -> Result<Vec<ParameterSet>, ValidationError> {
    check_ranges(ranges)?;
    let total = grid_size(ranges)?;
    let axes: Vec<Vec<f64>> = ranges.iter().map(|r| r.values()).collect();

    let mut out = Vec::with_capacity(total);
    let mut odometer = vec![0usize; axes.len()];
    for _ in 0..total {
        let set = ranges
            .iter()
            .zip(&axes)
            .zip(&odometer)
            .map(|((r, values), &k)| (r.name().to_string(), values[k]))
            .collect();
        out.push(set);

        for digit in (0..odometer.len()).rev() {
            odometer[digit] += 1;
            if odometer[digit] < axes[digit].len() {
                break;
            }
            odometer[digit] = 0;
        }
    }
    Ok(out)
}

/// Sampled candidates with repeats removed.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSample {
    pub candidates: Vec<ParameterSet>,
    pub duplicates: usize,
}

/// `n` draws from one `StdRng` seeded with `seed`.
///
/// Discrete ranges draw uniformly from `values()`; continuous ranges draw
/// uniformly from `[min, max]`. Repeats keep the first occurrence only.
pub fn random_candidates(
    ranges: &[ParameterRange],
    n: usize,
    seed: u64,
) -> Result<RandomSample, ValidationError> {
    check_ranges(ranges)?;
    if n == 0 {
        return Err(ValidationError::new("n_samples", "must be >= 1"));
    }
    let axes: Vec<Vec<f64>> = ranges
        .iter()
        .map(|r| if r.is_continuous() { Vec::new() } else { r.values() })
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(n);
    let mut candidates = Vec::with_capacity(n);
    let mut duplicates = 0;

    for _ in 0..n {
        let set: ParameterSet = ranges
            .iter()
            .zip(&axes)
            .map(|(r, values)| {
                let v = if r.is_continuous() {
                    if r.min() == r.max() {
                        r.min()
                    } else {
                        rng.gen_range(r.min()..=r.max())
                    }
                } else {
                    values[rng.gen_range(0..values.len())]
                };
                (r.name().to_string(), v)
            })
            .collect();
        if seen.insert(set.clone()) {
            candidates.push(set);
        } else {
            duplicates += 1;
        }
    }
    Ok(RandomSample {
        candidates,
        duplicates,
    })
}
