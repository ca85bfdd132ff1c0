//! Walk-forward validation — rolling train/test folds and out-of-sample scoring.
//!
//! Fold `k` trains on `[s, s + train_window)` and tests on
//! `[s + train_window, s + train_window + test_window)` with
//! `s = k * step`, for as long as the test window fits. Each fold searches
//! on its train slice only, then runs the selected set once on its test
//! slice only. The mean test score is the reported out-of-sample metric.
//!
//! The degradation ratio (mean test score / mean train score) flags
//! overfitting; edge cases where a ratio is meaningless are flagged instead.
//! The 0.1 low-train cutoff is on the score's own scale, so it suits Sharpe
//! and Calmar better than the bounded composite score.
//!
//! Scores at `SENTINEL_LOW_SCORE` (no variance, no drawdown) stay out of
//! both means and are counted separately.

use quantlab_core::{InsufficientDataError, ParameterSet, ValidationError};
use serde::{Deserialize, Serialize};

use crate::result::{EvaluationOutcome, SearchStatus};
use crate::score::SENTINEL_LOW_SCORE;

// ─── Configuration ───────────────────────────────────────────────────

/// Search run inside each fold's train window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerSearch {
    #[default]
    Grid,
    /// Uses `n_samples` and `random_seed`; the same sample serves every fold.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Bars per train window (default 252, one trading year).
    pub train_window: usize,
    /// Bars per test window (default 63, one quarter).
    pub test_window: usize,
    /// Bars the fold start advances by (default 63).
    pub step: usize,
    pub inner: InnerSearch,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_window: 252,
            test_window: 63,
            step: 63,
            inner: InnerSearch::Grid,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, v) in [
            ("train_window", self.train_window),
            ("test_window", self.test_window),
            ("step", self.step),
        ] {
            if v == 0 {
                return Err(ValidationError::new(name, "must be >= 1"));
            }
        }
        Ok(())
    }
}

// ─── Folds ───────────────────────────────────────────────────────────

/// Bar index ranges of one fold; ends are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldSpec {
    pub fold_index: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Split `total_bars` into rolling folds.
///
/// Errors when the config is invalid or when not even one fold fits.
pub fn create_folds(
    total_bars: usize,
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSpec>, WalkForwardError> {
    config.validate()?;
    let span = config.train_window + config.test_window;
    if total_bars < span {
        return Err(InsufficientDataError::new("walk-forward", span, total_bars).into());
    }

    let mut folds = Vec::new();
    let mut start = 0;
    while start + span <= total_bars {
        let train_end = start + config.train_window;
        folds.push(FoldSpec {
            fold_index: folds.len(),
            train_start: start,
            train_end,
            test_start: train_end,
            test_end: train_end + config.test_window,
        });
        start += config.step;
    }
    Ok(folds)
}

/// Errors raised before any fold runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalkForwardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
}

// ─── Results ─────────────────────────────────────────────────────────

/// Outcome of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub spec: FoldSpec,
    /// Status of the inner search on the train slice.
    pub train_status: SearchStatus,
    /// Set selected on the train slice; `None` when nothing completed.
    pub best_params: Option<ParameterSet>,
    pub train_score: Option<f64>,
    /// Score of `best_params` on the test slice, when that run completed.
    pub test_score: Option<f64>,
    /// `None` when there was nothing to test.
    pub test_outcome: Option<EvaluationOutcome>,
}

/// How the degradation ratio was computed (or why it wasn't).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationFlag {
    /// Train score >= 0.1, ratio computed normally.
    Normal,
    /// Train score in [0, 0.1): difference (test - train) reported instead.
    LowTrainScore,
    /// Train score negative, ratio skipped.
    NegativeTrainScore,
    /// Train score >= 0.1 but test score negative: clamped to 0.0.
    FailedTest,
    /// No fold produced both a train and a test score.
    InsufficientData,
}

/// Aggregate of a walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub folds: Vec<FoldResult>,
    /// Mean of the selected train scores over folds that selected a set.
    pub mean_train_score: Option<f64>,
    /// Mean test score over folds whose test run completed.
    pub mean_test_score: Option<f64>,
    /// Folds whose train score was the sentinel.
    pub sentinel_train_folds: usize,
    /// Folds whose test score was the sentinel, typically a flat test slice.
    pub sentinel_test_folds: usize,
    pub degradation_ratio: Option<f64>,
    pub degradation_flag: DegradationFlag,
    pub status: SearchStatus,
    pub timed_out: bool,
    pub elapsed_secs: f64,
}

impl WalkForwardResult {
    /// Aggregate fold results. `stopped` marks a run cut short by
    /// cancellation or timeout.
    pub fn from_folds(
        folds: Vec<FoldResult>,
        stopped: bool,
        timed_out: bool,
        elapsed_secs: f64,
    ) -> Self {
        let (mean_train_score, sentinel_train_folds) =
            mean_excluding_sentinel(folds.iter().filter_map(|f| f.train_score));
        let (mean_test_score, sentinel_test_folds) =
            mean_excluding_sentinel(folds.iter().filter_map(|f| f.test_score));
        let (degradation_ratio, degradation_flag) = match (mean_train_score, mean_test_score) {
            (Some(train), Some(test)) => compute_degradation_ratio(train, test),
            _ => (None, DegradationFlag::InsufficientData),
        };

        let status = if stopped {
            SearchStatus::Cancelled
        } else if folds.iter().all(|f| f.best_params.is_none()) {
            SearchStatus::Failed
        } else {
            SearchStatus::Completed
        };

        Self {
            folds,
            mean_train_score,
            mean_test_score,
            sentinel_train_folds,
            sentinel_test_folds,
            degradation_ratio,
            degradation_flag,
            status,
            timed_out,
            elapsed_secs,
        }
    }
}

/// Mean of the real scores, plus how many sentinel scores were skipped.
fn mean_excluding_sentinel(values: impl Iterator<Item = f64>) -> (Option<f64>, usize) {
    let (sum, n, skipped) = values.fold((0.0, 0usize, 0usize), |(s, n, k), v| {
        if v <= SENTINEL_LOW_SCORE {
            (s, n, k + 1)
        } else {
            (s + v, n + 1, k)
        }
    });
    ((n > 0).then(|| sum / n as f64), skipped)
}

/// Degradation ratio with edge cases:
///
/// - train >= 0.1: ratio = test / train (Normal)
/// - 0 <= train < 0.1: difference = test - train (LowTrainScore)
/// - train < 0: skipped (NegativeTrainScore)
/// - train >= 0.1 but test < 0: clamped to 0.0 (FailedTest)
pub fn compute_degradation_ratio(
    mean_train_score: f64,
    mean_test_score: f64,
) -> (Option<f64>, DegradationFlag) {
    if mean_train_score < 0.0 {
        (None, DegradationFlag::NegativeTrainScore)
    } else if mean_train_score < 0.1 {
        (
            Some(mean_test_score - mean_train_score),
            DegradationFlag::LowTrainScore,
        )
    } else if mean_test_score < 0.0 {
        (Some(0.0), DegradationFlag::FailedTest)
    } else {
        (
            Some(mean_test_score / mean_train_score),
            DegradationFlag::Normal,
        )
    }
}
