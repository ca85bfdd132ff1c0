//! Parameter optimizer — grid, random, sensitivity and walk-forward search.
//!
//! Candidates are generated on the calling thread, dispatched with
//! `par_iter` inside a bounded `rayon::ThreadPool`, and streamed back over
//! an `mpsc` channel to one collector (the calling thread), which is the
//! only writer of the result. Results are slotted by enumeration index, so
//! the outcome does not depend on the worker count or arrival order.
//!
//! Cancellation and the optional timeout are checked before each evaluation
//! starts; evaluations already running finish normally.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use quantlab_core::{
    InsufficientDataError, ParameterRange, ParameterSet, PriceSeries, Simulator, Strategy,
    ValidationError,
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::result::{
    Evaluation, EvaluationOutcome, FailedEvaluation, OptimizationResult, SearchStatus,
    SensitivityCurve, SensitivityPoint,
};
use crate::score::FAILED_SCORE;
use crate::search::{grid_candidates, random_candidates};
use crate::walk_forward::{
    create_folds, FoldResult, InnerSearch, WalkForwardConfig, WalkForwardError, WalkForwardResult,
};

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("a search is already running on this optimizer")]
    AlreadyRunning,
}

impl From<WalkForwardError> for OptimizerError {
    fn from(e: WalkForwardError) -> Self {
        match e {
            WalkForwardError::Validation(e) => OptimizerError::Validation(e),
            WalkForwardError::InsufficientData(e) => OptimizerError::InsufficientData(e),
        }
    }
}

/// Cooperative stop signal shared between the caller and running searches.
///
/// Once cancelled it stays cancelled; call [`reset`](Self::reset) before
/// reusing it for another search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Progress callback: `(completed, total)` for the current batch.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct Optimizer {
    strategy: Arc<dyn Strategy>,
    series: Arc<PriceSeries>,
    config: OptimizerConfig,
    simulator: Simulator,
    cancel: CancellationToken,
    progress: Option<ProgressFn>,
    status: Mutex<SearchStatus>,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("strategy", &self.strategy.name())
            .field("bars", &self.series.len())
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Evaluations of one batch, slotted by candidate index.
struct Batch {
    slots: Vec<Option<Evaluation>>,
    timed_out: bool,
}

impl Batch {
    fn skipped(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

impl Optimizer {
    /// Fails when `config` does not validate.
    pub fn new(
        strategy: Arc<dyn Strategy>,
        series: Arc<PriceSeries>,
        config: OptimizerConfig,
    ) -> Result<Self, OptimizerError> {
        config.validate()?;
        let simulator = Simulator::new(config.engine.clone());
        Ok(Self {
            strategy,
            series,
            config,
            simulator,
            cancel: CancellationToken::new(),
            progress: None,
            status: Mutex::new(SearchStatus::Idle),
        })
    }

    /// Use an externally owned token, e.g. one wired to Ctrl-C.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn status(&self) -> SearchStatus {
        *self.lock_status()
    }

    // ─── Searches ────────────────────────────────────────────────────

    pub fn grid_search(
        &self,
        ranges: &[ParameterRange],
    ) -> Result<OptimizationResult, OptimizerError> {
        let candidates = grid_candidates(ranges)?;
        info!(
            strategy = self.strategy.name(),
            candidates = candidates.len(),
            workers = self.config.worker_count,
            "grid search started"
        );
        self.search(candidates, 0)
    }

    pub fn random_search(
        &self,
        ranges: &[ParameterRange],
        n_samples: usize,
    ) -> Result<OptimizationResult, OptimizerError> {
        let sample = random_candidates(ranges, n_samples, self.config.random_seed)?;
        info!(
            strategy = self.strategy.name(),
            samples = n_samples,
            unique = sample.candidates.len(),
            seed = self.config.random_seed,
            workers = self.config.worker_count,
            "random search started"
        );
        self.search(sample.candidates, sample.duplicates)
    }

    /// Sweep `target` with every other parameter held at `base_params`.
    pub fn sensitivity_analysis(
        &self,
        base_params: &ParameterSet,
        target: &ParameterRange,
    ) -> Result<SensitivityCurve, OptimizerError> {
        let values = target.values();
        let candidates: Vec<ParameterSet> = values
            .iter()
            .map(|&v| base_params.clone().with(target.name(), v))
            .collect();
        let pool = self.build_pool()?;
        let guard = self.begin()?;
        info!(
            strategy = self.strategy.name(),
            parameter = target.name(),
            points = candidates.len(),
            "sensitivity analysis started"
        );

        let deadline = self.deadline();
        let batch = self.evaluate_all(&pool, &self.series, &candidates, deadline);
        let skipped = batch.skipped();
        let timed_out = batch.timed_out;
        let points: Vec<SensitivityPoint> = values
            .into_iter()
            .zip(batch.slots)
            .filter_map(|(value, slot)| {
                slot.map(|e| SensitivityPoint {
                    value,
                    score: e.score,
                    outcome: e.outcome,
                })
            })
            .collect();
        let any_completed = points
            .iter()
            .any(|p| matches!(p.outcome, EvaluationOutcome::Completed(_)));
        let status = finished_status(skipped, any_completed);

        info!(parameter = target.name(), ?status, points = points.len(), "sensitivity analysis finished");
        guard.finish(status);
        Ok(SensitivityCurve {
            parameter: target.name().to_string(),
            base_params: base_params.clone(),
            points,
            status,
            timed_out,
        })
    }

    /// Rolling train/test validation. Each fold searches on its train slice
    /// only and runs the selected set once on its test slice only.
    ///
    /// A random inner search draws its sample once and reuses it in every
    /// fold.
    pub fn walk_forward(
        &self,
        ranges: &[ParameterRange],
        wf: &WalkForwardConfig,
    ) -> Result<WalkForwardResult, OptimizerError> {
        let folds = create_folds(self.series.len(), wf)?;
        let candidates = match wf.inner {
            InnerSearch::Grid => grid_candidates(ranges)?,
            InnerSearch::Random => {
                random_candidates(ranges, self.config.n_samples, self.config.random_seed)?
                    .candidates
            }
        };
        let pool = self.build_pool()?;
        let guard = self.begin()?;
        let started = Instant::now();
        info!(
            strategy = self.strategy.name(),
            folds = folds.len(),
            candidates = candidates.len(),
            inner = ?wf.inner,
            "walk-forward started"
        );

        let deadline = self.deadline();
        let mut results = Vec::with_capacity(folds.len());
        let mut stopped = false;
        let mut timed_out = false;

        for spec in folds {
            if self.cancel.is_cancelled() {
                stopped = true;
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                stopped = true;
                timed_out = true;
                break;
            }

            let train = self.series.slice(spec.train_start..spec.train_end);
            let batch = self.evaluate_all(&pool, &train, &candidates, deadline);
            timed_out |= batch.timed_out;
            let train_cut_short = batch.skipped() > 0;
            let train_result = summarize(&candidates, batch, 0, 0.0);

            let (test_score, test_outcome) = match (&train_result.best_params, train_cut_short) {
                (Some(best), false) => {
                    let test = self.series.slice(spec.test_start..spec.test_end);
                    let eval = self.evaluate(&test, best, 0);
                    let score = eval.is_completed().then_some(eval.score);
                    (score, Some(eval.outcome))
                }
                _ => (None, None),
            };

            info!(
                fold = spec.fold_index,
                status = ?train_result.status,
                train_score = ?train_result.best_score,
                test_score = ?test_score,
                "fold finished"
            );
            results.push(FoldResult {
                spec,
                train_status: train_result.status,
                best_params: train_result.best_params,
                train_score: train_result.best_score,
                test_score,
                test_outcome,
            });

            if train_cut_short {
                stopped = true;
                break;
            }
        }

        let result = WalkForwardResult::from_folds(
            results,
            stopped,
            timed_out,
            started.elapsed().as_secs_f64(),
        );
        info!(
            status = ?result.status,
            mean_test_score = ?result.mean_test_score,
            degradation = ?result.degradation_flag,
            "walk-forward finished"
        );
        guard.finish(result.status);
        Ok(result)
    }

    // ─── Internals ───────────────────────────────────────────────────

    fn search(
        &self,
        candidates: Vec<ParameterSet>,
        duplicate_samples: usize,
    ) -> Result<OptimizationResult, OptimizerError> {
        let pool = self.build_pool()?;
        let guard = self.begin()?;
        let started = Instant::now();

        let batch = self.evaluate_all(&pool, &self.series, &candidates, self.deadline());
        let result = summarize(
            &candidates,
            batch,
            duplicate_samples,
            started.elapsed().as_secs_f64(),
        );

        if result.status == SearchStatus::Failed {
            warn!(failed = result.failed.len(), "every evaluation failed");
        }
        info!(
            status = ?result.status,
            evaluated = result.evaluated,
            total = result.total,
            best_score = ?result.best_score,
            best_params = ?result.best_params.as_ref().map(ToString::to_string),
            elapsed_secs = result.elapsed_secs,
            "search finished"
        );
        guard.finish(result.status);
        Ok(result)
    }

    fn evaluate_all(
        &self,
        pool: &rayon::ThreadPool,
        series: &PriceSeries,
        candidates: &[ParameterSet],
        deadline: Option<Instant>,
    ) -> Batch {
        let total = candidates.len();
        let mut slots: Vec<Option<Evaluation>> = vec![None; total];
        let timed_out = AtomicBool::new(false);
        let timed_out_flag = &timed_out;
        let (tx, rx) = mpsc::channel::<Evaluation>();

        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    candidates
                        .par_iter()
                        .enumerate()
                        .for_each_with(tx, |tx, (index, params)| {
                            if self.cancel.is_cancelled() {
                                return;
                            }
                            if deadline.is_some_and(|d| Instant::now() >= d) {
                                timed_out_flag.store(true, Ordering::Relaxed);
                                return;
                            }
                            // The receiver outlives every sender.
                            let _ = tx.send(self.evaluate(series, params, index));
                        });
                });
            });

            let mut completed = 0;
            for evaluation in rx {
                completed += 1;
                if let Some(progress) = &self.progress {
                    progress(completed, total);
                }
                let index = evaluation.index;
                slots[index] = Some(evaluation);
            }
        });

        Batch {
            slots,
            timed_out: timed_out.into_inner(),
        }
    }

    fn evaluate(&self, series: &PriceSeries, params: &ParameterSet, index: usize) -> Evaluation {
        match self.simulator.run(series, self.strategy.as_ref(), params) {
            Ok(result) => Evaluation {
                index,
                score: self.config.score.score(&result),
                outcome: EvaluationOutcome::Completed(Box::new(result)),
            },
            Err(e) => {
                debug!(params = %params, error = %e, "evaluation failed");
                Evaluation {
                    index,
                    score: FAILED_SCORE,
                    outcome: EvaluationOutcome::Failed {
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, OptimizerError> {
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_count)
            .build()?)
    }

    fn deadline(&self) -> Option<Instant> {
        self.config
            .timeout()
            .and_then(|t| Instant::now().checked_add(t))
    }

    fn lock_status(&self) -> MutexGuard<'_, SearchStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<RunGuard<'_>, OptimizerError> {
        let mut status = self.lock_status();
        if *status == SearchStatus::Running {
            return Err(OptimizerError::AlreadyRunning);
        }
        let previous = *status;
        *status = SearchStatus::Running;
        Ok(RunGuard {
            optimizer: self,
            previous,
            finished: false,
        })
    }
}

/// Holds the `Running` state; restores the previous state if dropped
/// without `finish` (a panic mid-search).
struct RunGuard<'a> {
    optimizer: &'a Optimizer,
    previous: SearchStatus,
    finished: bool,
}

impl RunGuard<'_> {
    fn finish(mut self, status: SearchStatus) {
        *self.optimizer.lock_status() = status;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.optimizer.lock_status() = self.previous;
        }
    }
}

fn finished_status(skipped: usize, any_completed: bool) -> SearchStatus {
    if skipped > 0 {
        SearchStatus::Cancelled
    } else if !any_completed {
        SearchStatus::Failed
    } else {
        SearchStatus::Completed
    }
}

/// Fold a batch into an `OptimizationResult`. The best set is the highest
/// score among completed runs; ties go to the lowest index.
fn summarize(
    candidates: &[ParameterSet],
    batch: Batch,
    duplicate_samples: usize,
    elapsed_secs: f64,
) -> OptimizationResult {
    let skipped = batch.skipped();
    let mut all_results = HashMap::with_capacity(candidates.len() - skipped);
    let mut failed = Vec::new();
    let mut best: Option<(usize, f64)> = None;

    for (params, slot) in candidates.iter().zip(batch.slots) {
        let Some(evaluation) = slot else { continue };
        match &evaluation.outcome {
            EvaluationOutcome::Completed(_) => {
                if best.map_or(true, |(_, s)| evaluation.score > s) {
                    best = Some((evaluation.index, evaluation.score));
                }
            }
            EvaluationOutcome::Failed { error } => failed.push(FailedEvaluation {
                params: params.clone(),
                error: error.clone(),
            }),
        }
        all_results.insert(params.clone(), evaluation);
    }

    let status = finished_status(skipped, best.is_some());
    OptimizationResult {
        best_params: best.map(|(i, _)| candidates[i].clone()),
        best_score: best.map(|(_, s)| s),
        evaluated: all_results.len(),
        all_results,
        failed,
        status,
        timed_out: batch.timed_out,
        total: candidates.len(),
        duplicate_samples,
        elapsed_secs,
    }
}
