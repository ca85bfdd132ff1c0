//! Score functions — map one `BacktestResult` to a scalar for ranking.
//!
//! Higher is always better. Degenerate inputs (zero variance, zero drawdown,
//! non-finite values) map to `SENTINEL_LOW_SCORE`, which ranks below every
//! real score but above `FAILED_SCORE`, the score of a failed run.

use std::fmt;
use std::str::FromStr;

use quantlab_core::{BacktestResult, ValidationError};
use serde::{Deserialize, Serialize};

/// Score of a run whose ratio is undefined. Finite, so it still ranks.
pub const SENTINEL_LOW_SCORE: f64 = -1e9;

/// Score of a run that failed to complete.
pub const FAILED_SCORE: f64 = f64::NEG_INFINITY;

/// Weights for the composite score. Each sub-score is normalized to [-1, 1]
/// before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub sharpe: f64,
    pub calmar: f64,
    pub total_return: f64,
    pub win_rate: f64,
    pub drawdown: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            sharpe: 0.3,
            calmar: 0.0,
            total_return: 0.4,
            win_rate: 0.15,
            drawdown: 0.15,
        }
    }
}

impl CompositeWeights {
    pub fn new(
        sharpe: f64,
        calmar: f64,
        total_return: f64,
        win_rate: f64,
        drawdown: f64,
    ) -> Result<Self, ValidationError> {
        let weights = Self {
            sharpe,
            calmar,
            total_return,
            win_rate,
            drawdown,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, w) in self.named() {
            if !w.is_finite() || w < 0.0 {
                return Err(ValidationError::new(
                    format!("weights.{name}"),
                    format!("must be finite and >= 0, got {w}"),
                ));
            }
        }
        if self.total() <= 0.0 {
            return Err(ValidationError::new("weights", "at least one weight must be > 0"));
        }
        Ok(())
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("sharpe", self.sharpe),
            ("calmar", self.calmar),
            ("total_return", self.total_return),
            ("win_rate", self.win_rate),
            ("drawdown", self.drawdown),
        ]
    }

    fn total(&self) -> f64 {
        self.named().iter().map(|(_, w)| w).sum()
    }
}

/// Which objective the optimizer maximizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreFunction {
    #[default]
    Sharpe,
    Calmar,
    TotalReturn,
    RiskAdjustedReturn,
    ProfitFactor,
    Composite(CompositeWeights),
}

impl ScoreFunction {
    pub fn score(&self, result: &BacktestResult) -> f64 {
        let raw = match self {
            ScoreFunction::Sharpe => sharpe_score(result),
            ScoreFunction::Calmar => calmar_score(result),
            ScoreFunction::TotalReturn => result.total_return,
            ScoreFunction::RiskAdjustedReturn => risk_adjusted_return(result),
            ScoreFunction::ProfitFactor => result.metrics.profit_factor,
            ScoreFunction::Composite(weights) => composite_score(result, weights),
        };
        sanitize(raw)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScoreFunction::Sharpe => "sharpe",
            ScoreFunction::Calmar => "calmar",
            ScoreFunction::TotalReturn => "total_return",
            ScoreFunction::RiskAdjustedReturn => "risk_adjusted_return",
            ScoreFunction::ProfitFactor => "profit_factor",
            ScoreFunction::Composite(_) => "composite",
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ScoreFunction::Composite(weights) => weights.validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ScoreFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoreFunction {
    type Err = ValidationError;

    /// `composite` selects the default weights.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharpe" => Ok(ScoreFunction::Sharpe),
            "calmar" => Ok(ScoreFunction::Calmar),
            "total_return" => Ok(ScoreFunction::TotalReturn),
            "risk_adjusted_return" => Ok(ScoreFunction::RiskAdjustedReturn),
            "profit_factor" => Ok(ScoreFunction::ProfitFactor),
            "composite" => Ok(ScoreFunction::Composite(CompositeWeights::default())),
            other => Err(ValidationError::new(
                "score",
                format!(
                    "unknown score function `{other}` (known: sharpe, calmar, total_return, \
                     risk_adjusted_return, profit_factor, composite)"
                ),
            )),
        }
    }
}

// ─── Individual scores ───────────────────────────────────────────────

/// Annualized Sharpe, or the sentinel when returns have no variance.
pub fn sharpe_score(result: &BacktestResult) -> f64 {
    result.metrics.sharpe.unwrap_or(SENTINEL_LOW_SCORE)
}

/// Annualized return over max drawdown, or the sentinel with no drawdown.
pub fn calmar_score(result: &BacktestResult) -> f64 {
    result.metrics.calmar.unwrap_or(SENTINEL_LOW_SCORE)
}

/// Total return over max drawdown; plain total return when there is no drawdown.
pub fn risk_adjusted_return(result: &BacktestResult) -> f64 {
    if result.max_drawdown > 0.0 {
        result.total_return / result.max_drawdown
    } else {
        result.total_return
    }
}

pub fn composite_score(result: &BacktestResult, weights: &CompositeWeights) -> f64 {
    let parts = [
        (weights.sharpe, squash(sharpe_score(result))),
        (weights.calmar, squash(calmar_score(result))),
        (weights.total_return, squash(result.total_return)),
        (weights.win_rate, 2.0 * result.metrics.win_rate - 1.0),
        (weights.drawdown, (1.0 - 2.0 * result.max_drawdown).clamp(-1.0, 1.0)),
    ];
    let total = weights.total();
    if total <= 0.0 {
        return SENTINEL_LOW_SCORE;
    }
    parts.iter().map(|(w, n)| w * n).sum::<f64>() / total
}

/// Map an unbounded value into (-1, 1); the sentinel maps to -1.
fn squash(x: f64) -> f64 {
    if x <= SENTINEL_LOW_SCORE || !x.is_finite() {
        return -1.0;
    }
    x / (1.0 + x.abs())
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() {
        score.max(SENTINEL_LOW_SCORE)
    } else {
        SENTINEL_LOW_SCORE
    }
}
