//! QuantLab Runner — parameter optimization on top of `quantlab-core`.
//!
//! This crate provides:
//! - Score functions mapping a `BacktestResult` to a rankable scalar
//! - Grid, random, sensitivity and walk-forward search on a bounded worker pool
//! - Cooperative cancellation and timeouts
//! - TOML optimizer configuration
//! - CSV bar loading and JSON/CSV report export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod optimizer;
pub mod result;
pub mod score;
pub mod search;
pub mod walk_forward;

pub use config::{ConfigError, OptimizerConfig, SearchMode};
pub use data_loader::{load_csv, read_csv, LoadError};
pub use export::{OptimizationReport, ReportRow};
pub use optimizer::{CancellationToken, Optimizer, OptimizerError};
pub use result::{
    Evaluation, EvaluationOutcome, FailedEvaluation, OptimizationResult, SearchStatus,
    SensitivityCurve, SensitivityPoint,
};
pub use score::{CompositeWeights, ScoreFunction, FAILED_SCORE, SENTINEL_LOW_SCORE};
pub use walk_forward::{
    DegradationFlag, FoldResult, FoldSpec, InnerSearch, WalkForwardConfig, WalkForwardResult,
};
