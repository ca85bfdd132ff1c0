//! Error taxonomy shared by the indicator engine and the simulator.
//!
//! - `ValidationError`: malformed parameters, rejected before any computation.
//! - `InsufficientDataError`: the series is too short for the request.
//! - `StrategyRuntimeError`: a strategy failed while evaluating one run.
//!
//! Numeric degeneracies (zero variance, zero drawdown) are not errors; the
//! scoring layer maps them to sentinel values.

use thiserror::Error;

/// A parameter failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid parameter `{parameter}`: {reason}")]
pub struct ValidationError {
    pub parameter: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// The supplied series cannot satisfy the requested window or fold sizes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient data for {context}: need {required} bars, have {available}")]
pub struct InsufficientDataError {
    pub context: String,
    pub required: usize,
    pub available: usize,
}

impl InsufficientDataError {
    pub fn new(context: impl Into<String>, required: usize, available: usize) -> Self {
        Self {
            context: context.into(),
            required,
            available,
        }
    }
}

/// A strategy failed during a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("strategy `{strategy}` failed: {message}")]
pub struct StrategyRuntimeError {
    pub strategy: String,
    pub message: String,
}

impl StrategyRuntimeError {
    pub fn new(strategy: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            message: message.into(),
        }
    }
}

/// Errors from a single backtest run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
    #[error(transparent)]
    Strategy(#[from] StrategyRuntimeError),
}
