//! Integration tests for the optimizer.
//!
//! Tests:
//! 1. Grid and random search: enumeration, dedup, reproducibility across worker counts
//! 2. Selection: tie-break by index, partial and total failure
//! 3. Lifecycle: cancellation, timeout, AlreadyRunning, restart after finish
//! 4. Sensitivity analysis sweep order
//! 5. Walk-forward: fold layout, train/test isolation, insufficient data

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveDate};
use quantlab_core::{
    Bar, BarContext, BuiltinStrategy, EngineConfig, IndicatorValues, ParameterRange, ParameterSet,
    PriceSeries, Strategy, StrategyRuntimeError, Target, ValidationError,
};
use quantlab_runner::{
    EvaluationOutcome, InnerSearch, OptimizerConfig, Optimizer, OptimizerError, ScoreFunction,
    SearchStatus, WalkForwardConfig,
};

// ─── Fixtures ────────────────────────────────────────────────────────

fn series_from(closes: &[f64]) -> PriceSeries {
    let base = NaiveDate::from_ymd_opt(2022, 1, 3)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + Duration::days(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 10_000.0,
            }
        })
        .collect();
    PriceSeries::new(bars).unwrap()
}

fn wavy_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.05 * t + 8.0 * (t / 9.0).sin() + 3.0 * (t / 3.7).cos()
        })
        .collect()
}

fn range(name: &str, min: f64, max: f64, step: f64) -> ParameterRange {
    ParameterRange::new(name, min, max, step).unwrap()
}

fn ma_ranges() -> Vec<ParameterRange> {
    vec![
        range("fast_period", 5.0, 15.0, 5.0),
        range("slow_period", 20.0, 30.0, 10.0),
    ]
}

fn config(workers: usize) -> OptimizerConfig {
    OptimizerConfig {
        worker_count: workers,
        engine: EngineConfig {
            allow_short: true,
            ..EngineConfig::frictionless(100_000.0)
        },
        ..OptimizerConfig::default()
    }
}

fn dual_ma_optimizer(bars: usize, config: OptimizerConfig) -> Optimizer {
    Optimizer::new(
        BuiltinStrategy::DualMa.build(),
        Arc::new(series_from(&wavy_closes(bars))),
        config,
    )
    .unwrap()
}

/// Test strategy with controllable failure and latency.
struct Scripted {
    /// `prepare` fails when `p` is odd.
    fail_odd: bool,
    /// `prepare` fails for every set.
    fail_all: bool,
    delay: StdDuration,
    target: Target,
}

impl Scripted {
    fn flat() -> Self {
        Self {
            fail_odd: false,
            fail_all: false,
            delay: StdDuration::ZERO,
            target: Target::Flat,
        }
    }

    fn slow(ms: u64) -> Self {
        Self {
            delay: StdDuration::from_millis(ms),
            ..Self::flat()
        }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    fn prepare(
        &self,
        _series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let p = params.get_or("p", 0.0) as i64;
        if self.fail_all || (self.fail_odd && p % 2 == 1) {
            return Err(ValidationError::new("p", "rejected"));
        }
        Ok(IndicatorValues::new())
    }

    fn target(
        &self,
        _ctx: &BarContext<'_>,
        _params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        Ok(self.target)
    }
}

fn scripted_optimizer(strategy: Scripted, config: OptimizerConfig) -> Optimizer {
    Optimizer::new(
        Arc::new(strategy),
        Arc::new(series_from(&wavy_closes(60))),
        config,
    )
    .unwrap()
}

fn p_range(n: usize) -> Vec<ParameterRange> {
    vec![range("p", 0.0, (n - 1) as f64, 1.0)]
}

// ─── Grid and random search ─────────────────────────────────────────

#[test]
fn grid_evaluates_every_set_once() {
    let opt = dual_ma_optimizer(300, config(4));
    let result = opt.grid_search(&ma_ranges()).unwrap();

    assert_eq!(result.total, 6);
    assert_eq!(result.evaluated, 6);
    assert_eq!(result.all_results.len(), 6);
    assert_eq!(result.status, SearchStatus::Completed);
    assert_eq!(opt.status(), SearchStatus::Completed);

    let mut indices: Vec<usize> = result.all_results.values().map(|e| e.index).collect();
    indices.sort_unstable();
    assert_eq!(indices, (0..6).collect::<Vec<_>>());

    let best = result.best_params.clone().unwrap();
    let best_score = result.best_score.unwrap();
    assert!(result.all_results.values().all(|e| e.score <= best_score));
    assert_eq!(result.all_results[&best].score, best_score);
}

#[test]
fn identical_results_for_any_worker_count() {
    let single = dual_ma_optimizer(300, config(1))
        .grid_search(&ma_ranges())
        .unwrap();
    let many = dual_ma_optimizer(300, config(8))
        .grid_search(&ma_ranges())
        .unwrap();

    assert_eq!(single.best_params, many.best_params);
    assert_eq!(single.best_score, many.best_score);
    assert_eq!(single.all_results, many.all_results);
}

#[test]
fn random_search_is_seeded_and_deduplicated() {
    let ranges = ma_ranges();
    let a = dual_ma_optimizer(300, config(2))
        .random_search(&ranges, 30)
        .unwrap();
    let b = dual_ma_optimizer(300, config(3))
        .random_search(&ranges, 30)
        .unwrap();

    assert_eq!(a.all_results, b.all_results);
    assert!(a.evaluated <= 6);
    assert_eq!(a.evaluated + a.duplicate_samples, 30);

    let mut other_seed = config(2);
    other_seed.random_seed = 7;
    let c = dual_ma_optimizer(300, other_seed)
        .random_search(&[range("fast_period", 2.0, 19.0, 1.0)], 5)
        .unwrap();
    assert!(c.evaluated >= 1);
}

#[test]
fn duplicate_range_names_rejected() {
    let opt = dual_ma_optimizer(100, config(1));
    let ranges = [range("fast_period", 5.0, 6.0, 1.0), range("fast_period", 7.0, 8.0, 1.0)];
    assert!(matches!(
        opt.grid_search(&ranges),
        Err(OptimizerError::Validation(e)) if e.parameter == "ranges"
    ));
    assert_eq!(opt.status(), SearchStatus::Idle);
}

// ─── Selection ───────────────────────────────────────────────────────

#[test]
fn equal_scores_pick_lowest_index() {
    // Flat targets never trade, so every set gets the same sentinel score.
    let opt = scripted_optimizer(Scripted::flat(), config(4));
    let result = opt.grid_search(&p_range(10)).unwrap();
    assert_eq!(result.status, SearchStatus::Completed);
    assert_eq!(result.best_params, Some(ParameterSet::new().with("p", 0.0)));
}

#[test]
fn partial_failures_are_isolated() {
    let strategy = Scripted {
        fail_odd: true,
        target: Target::Long,
        ..Scripted::flat()
    };
    let result = scripted_optimizer(strategy, config(3))
        .grid_search(&p_range(6))
        .unwrap();

    assert_eq!(result.status, SearchStatus::Completed);
    assert_eq!(result.failed.len(), 3);
    assert_eq!(result.completed_count(), 3);
    let best = result.best_params.unwrap();
    assert_eq!(best.get("p").unwrap() as i64 % 2, 0);
    for failure in &result.failed {
        let eval = &result.all_results[&failure.params];
        assert_eq!(eval.score, f64::NEG_INFINITY);
        assert!(failure.error.contains("rejected"));
    }
}

#[test]
fn all_failures_mean_failed_status() {
    let strategy = Scripted {
        fail_all: true,
        ..Scripted::flat()
    };
    let opt = scripted_optimizer(strategy, config(2));
    let result = opt.grid_search(&p_range(4)).unwrap();
    assert_eq!(result.status, SearchStatus::Failed);
    assert!(result.best_params.is_none());
    assert!(result.best_score.is_none());
    assert_eq!(result.failed.len(), 4);
    assert_eq!(opt.status(), SearchStatus::Failed);
}

// ─── Lifecycle ───────────────────────────────────────────────────────

#[test]
fn cancelled_before_start_evaluates_nothing() {
    let opt = scripted_optimizer(Scripted::flat(), config(2));
    opt.cancellation_token().cancel();
    let result = opt.grid_search(&p_range(5)).unwrap();
    assert_eq!(result.status, SearchStatus::Cancelled);
    assert_eq!(result.evaluated, 0);
    assert!(result.best_params.is_none());
    assert!(!result.timed_out);

    opt.cancellation_token().reset();
    let again = opt.grid_search(&p_range(5)).unwrap();
    assert_eq!(again.status, SearchStatus::Completed);
}

#[test]
fn cancel_mid_run_keeps_partial_results() {
    let seen = Arc::new(AtomicUsize::new(0));
    let opt = scripted_optimizer(Scripted::slow(5), config(1));
    let token = opt.cancellation_token();
    let counter = Arc::clone(&seen);
    let opt = opt.with_progress(move |completed, total| {
        assert_eq!(total, 50);
        counter.store(completed, Ordering::SeqCst);
        if completed == 1 {
            token.cancel();
        }
    });

    let result = opt.grid_search(&p_range(50)).unwrap();
    assert_eq!(result.status, SearchStatus::Cancelled);
    assert!(result.evaluated >= 1);
    assert!(result.evaluated < 50);
    assert_eq!(result.evaluated, result.all_results.len());
    assert_eq!(seen.load(Ordering::SeqCst), result.evaluated);
    assert!(result.best_params.is_some());
}

#[test]
fn timeout_behaves_like_cancellation() {
    let mut cfg = config(1);
    cfg.timeout_secs = Some(0.05);
    let opt = scripted_optimizer(Scripted::slow(10), cfg);
    let result = opt.grid_search(&p_range(100)).unwrap();
    assert_eq!(result.status, SearchStatus::Cancelled);
    assert!(result.timed_out);
    assert!(result.evaluated < 100);
}

#[test]
fn oversized_timeout_runs_to_completion() {
    let mut cfg = config(2);
    cfg.timeout_secs = Some(1e300);
    let opt = dual_ma_optimizer(300, cfg);
    let result = opt.grid_search(&ma_ranges()).unwrap();
    assert_eq!(result.status, SearchStatus::Completed);
    assert!(!result.timed_out);
    assert_eq!(result.evaluated, 6);
}

#[test]
fn second_search_while_running_is_rejected() {
    let opt = Arc::new(scripted_optimizer(Scripted::slow(20), config(1)));
    let runner = {
        let opt = Arc::clone(&opt);
        std::thread::spawn(move || opt.grid_search(&p_range(10)))
    };

    let started = Instant::now();
    while opt.status() != SearchStatus::Running {
        assert!(started.elapsed() < StdDuration::from_secs(5), "search never started");
        std::thread::sleep(StdDuration::from_millis(1));
    }
    assert!(matches!(
        opt.grid_search(&p_range(2)),
        Err(OptimizerError::AlreadyRunning)
    ));

    let first = runner.join().unwrap().unwrap();
    assert_eq!(first.status, SearchStatus::Completed);
    assert_eq!(opt.status(), SearchStatus::Completed);

    // A finished optimizer may start again.
    let second = opt.grid_search(&p_range(2)).unwrap();
    assert_eq!(second.evaluated, 2);
}

// ─── Sensitivity ─────────────────────────────────────────────────────

#[test]
fn sensitivity_sweeps_in_order() {
    let opt = dual_ma_optimizer(300, config(4));
    let base = BuiltinStrategy::DualMa.build().default_params();
    let curve = opt
        .sensitivity_analysis(&base, &range("fast_period", 3.0, 9.0, 2.0))
        .unwrap();

    assert_eq!(curve.parameter, "fast_period");
    assert_eq!(curve.status, SearchStatus::Completed);
    let values: Vec<f64> = curve.points.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![3.0, 5.0, 7.0, 9.0]);
    for point in &curve.points {
        match &point.outcome {
            EvaluationOutcome::Completed(r) => assert_eq!(r.bar_count, 300),
            EvaluationOutcome::Failed { error } => panic!("unexpected failure: {error}"),
        }
    }
    assert!(curve.best_point().is_some());
    assert!(curve.score_spread().unwrap() >= 0.0);
}

#[test]
fn sensitivity_marks_invalid_values_failed() {
    let opt = dual_ma_optimizer(200, config(2));
    let base = ParameterSet::new().with("slow_period", 10.0);
    let curve = opt
        .sensitivity_analysis(&base, &range("fast_period", 5.0, 15.0, 5.0))
        .unwrap();
    // fast >= slow is rejected for 10 and 15.
    let failed = curve
        .points
        .iter()
        .filter(|p| matches!(p.outcome, EvaluationOutcome::Failed { .. }))
        .count();
    assert_eq!(failed, 2);
    assert_eq!(curve.status, SearchStatus::Completed);
}

// ─── Walk-forward ────────────────────────────────────────────────────

fn wf(train: usize, test: usize, step: usize) -> WalkForwardConfig {
    WalkForwardConfig {
        train_window: train,
        test_window: test,
        step,
        inner: InnerSearch::Grid,
    }
}

#[test]
fn walk_forward_rolls_folds() {
    let opt = dual_ma_optimizer(400, config(4));
    let result = opt.walk_forward(&ma_ranges(), &wf(150, 50, 50)).unwrap();

    assert_eq!(result.folds.len(), 5);
    assert_eq!(result.status, SearchStatus::Completed);
    for (k, fold) in result.folds.iter().enumerate() {
        assert_eq!(fold.spec.fold_index, k);
        assert_eq!(fold.spec.train_start, 50 * k);
        assert_eq!(fold.spec.test_start, fold.spec.train_end);
        assert_eq!(fold.spec.test_end - fold.spec.test_start, 50);
        assert!(fold.best_params.is_some());
        assert!(fold.test_score.is_some());
        match fold.test_outcome.as_ref().unwrap() {
            EvaluationOutcome::Completed(r) => assert_eq!(r.bar_count, 50),
            EvaluationOutcome::Failed { error } => panic!("test run failed: {error}"),
        }
    }
    assert!(result.mean_train_score.is_some());
    // flat test slices score the sentinel and are counted instead of averaged
    assert!(result.mean_test_score.is_some() || result.sentinel_test_folds == 5);
    assert!(result.sentinel_test_folds <= 5);
}

#[test]
fn test_window_bars_never_influence_selection() {
    let closes = wavy_closes(400);
    let mut mutated = closes.clone();
    for c in &mut mutated[150..200] {
        *c = *c * 1.8 + 20.0;
    }

    let cfg = wf(150, 50, 50);
    let run = |closes: &[f64]| {
        Optimizer::new(
            BuiltinStrategy::DualMa.build(),
            Arc::new(series_from(closes)),
            config(2),
        )
        .unwrap()
        .walk_forward(&ma_ranges(), &cfg)
        .unwrap()
    };
    let original = run(&closes);
    let changed = run(&mutated);

    // Bars 150..200 are fold 0's test window only.
    assert_eq!(original.folds[0].best_params, changed.folds[0].best_params);
    assert_eq!(original.folds[0].train_score, changed.folds[0].train_score);
}

#[test]
fn walk_forward_random_inner_search() {
    let mut cfg = config(2);
    cfg.n_samples = 4;
    let opt = dual_ma_optimizer(300, cfg);
    let wf_cfg = WalkForwardConfig {
        inner: InnerSearch::Random,
        ..wf(100, 50, 100)
    };
    let result = opt.walk_forward(&ma_ranges(), &wf_cfg).unwrap();
    assert_eq!(result.folds.len(), 2);
    assert!(result.folds.iter().all(|f| f.best_params.is_some()));
}

#[test]
fn walk_forward_needs_enough_bars() {
    let opt = dual_ma_optimizer(100, config(1));
    match opt.walk_forward(&ma_ranges(), &wf(80, 40, 10)) {
        Err(OptimizerError::InsufficientData(e)) => {
            assert_eq!(e.required, 120);
            assert_eq!(e.available, 100);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        opt.walk_forward(&ma_ranges(), &wf(50, 0, 10)),
        Err(OptimizerError::Validation(_))
    ));
}

#[test]
fn composite_score_drives_selection() {
    let mut cfg = config(2);
    cfg.score = "composite".parse::<ScoreFunction>().unwrap();
    let result = dual_ma_optimizer(300, cfg)
        .grid_search(&ma_ranges())
        .unwrap();
    let best = result.best_score.unwrap();
    assert!((-1.0..=1.0).contains(&best));
}
