//! Search results: per-candidate evaluations and the aggregate of one search.

use std::collections::HashMap;

use quantlab_core::{BacktestResult, ParameterSet};
use serde::{Deserialize, Serialize};

/// Lifecycle of an optimizer.
///
/// `Idle → Running → {Completed, Cancelled, Failed}`; a finished optimizer
/// goes back through `Running` when a new search starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SearchStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            SearchStatus::Completed | SearchStatus::Cancelled | SearchStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Completed(Box<BacktestResult>),
    Failed { error: String },
}

/// One scored parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Position of the candidate in enumeration order; breaks score ties.
    pub index: usize,
    /// `FAILED_SCORE` (−∞) when the run failed.
    pub score: f64,
    pub outcome: EvaluationOutcome,
}

impl Evaluation {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, EvaluationOutcome::Completed(_))
    }

    pub fn result(&self) -> Option<&BacktestResult> {
        match &self.outcome {
            EvaluationOutcome::Completed(r) => Some(r),
            EvaluationOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            EvaluationOutcome::Completed(_) => None,
            EvaluationOutcome::Failed { error } => Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEvaluation {
    pub params: ParameterSet,
    pub error: String,
}

/// Aggregate of one grid or random search.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Best completed evaluation; `None` when nothing completed.
    pub best_params: Option<ParameterSet>,
    pub best_score: Option<f64>,
    pub all_results: HashMap<ParameterSet, Evaluation>,
    /// Failed evaluations in enumeration order.
    pub failed: Vec<FailedEvaluation>,
    pub status: SearchStatus,
    pub timed_out: bool,
    /// Number of candidates the search enumerated.
    pub total: usize,
    /// Number of candidates actually evaluated.
    pub evaluated: usize,
    /// Random draws that repeated an earlier set and were not re-evaluated.
    pub duplicate_samples: usize,
    pub elapsed_secs: f64,
}

impl OptimizationResult {
    pub fn best(&self) -> Option<(&ParameterSet, &Evaluation)> {
        let params = self.best_params.as_ref()?;
        self.all_results.get_key_value(params)
    }

    pub fn best_result(&self) -> Option<&BacktestResult> {
        self.best().and_then(|(_, e)| e.result())
    }

    /// All evaluations, best first; ties keep enumeration order.
    pub fn ranked(&self) -> Vec<(&ParameterSet, &Evaluation)> {
        let mut rows: Vec<_> = self.all_results.iter().collect();
        rows.sort_by(|(_, a), (_, b)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.index.cmp(&b.index))
        });
        rows
    }

    pub fn completed_count(&self) -> usize {
        self.all_results.values().filter(|e| e.is_completed()).count()
    }
}

/// One point of a sensitivity sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: f64,
    pub score: f64,
    pub outcome: EvaluationOutcome,
}

/// Score as a function of one parameter, all others held fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCurve {
    pub parameter: String,
    pub base_params: ParameterSet,
    /// In sweep order. Points skipped by cancellation are absent.
    pub points: Vec<SensitivityPoint>,
    pub status: SearchStatus,
    pub timed_out: bool,
}

impl SensitivityCurve {
    /// Highest-scoring completed point; ties go to the earlier value.
    pub fn best_point(&self) -> Option<&SensitivityPoint> {
        self.completed()
            .reduce(|best, p| if p.score > best.score { p } else { best })
    }

    /// Max minus min score over completed points. Small spreads mean the
    /// strategy is insensitive to this parameter.
    pub fn score_spread(&self) -> Option<f64> {
        let scores: Vec<f64> = self.completed().map(|p| p.score).collect();
        let max = scores.iter().copied().reduce(f64::max)?;
        let min = scores.iter().copied().reduce(f64::min)?;
        Some(max - min)
    }

    fn completed(&self) -> impl Iterator<Item = &SensitivityPoint> {
        self.points
            .iter()
            .filter(|p| matches!(p.outcome, EvaluationOutcome::Completed(_)))
    }
}
