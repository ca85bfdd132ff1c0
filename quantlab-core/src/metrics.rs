//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Ratios whose denominator degenerates (zero variance, zero drawdown) return
//! `None` instead of a number; callers decide how to rank those.

use serde::{Deserialize, Serialize};

use crate::domain::Trade;

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    /// Annualized standard deviation of per-bar returns.
    pub volatility: f64,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub calmar: Option<f64>,
    /// Positive fraction, e.g. 0.15 for a 15% peak-to-trough decline.
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: usize,
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    /// |average win / average loss|; 0 when there are no losses.
    pub profit_loss_ratio: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(equity_curve: &[f64], trades: &[Trade], periods_per_year: f64) -> Self {
        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
        let avg_win = mean_f64(&wins);
        let avg_loss = mean_f64(&losses);

        Self {
            total_return: total_return(equity_curve),
            annualized_return: annualized_return(equity_curve, periods_per_year),
            volatility: volatility(equity_curve, periods_per_year),
            sharpe: sharpe_ratio(equity_curve, periods_per_year),
            sortino: sortino_ratio(equity_curve, periods_per_year),
            calmar: calmar_ratio(equity_curve, periods_per_year),
            max_drawdown: max_drawdown(equity_curve),
            max_drawdown_duration: max_drawdown_duration(equity_curve),
            trade_count: trades.len(),
            win_count: wins.len(),
            loss_count: losses.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            profit_loss_ratio: if avg_loss == 0.0 {
                0.0
            } else {
                (avg_win / avg_loss).abs()
            },
            avg_win,
            avg_loss,
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: final / initial - 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if initial > 0.0 => last / initial - 1.0,
        _ => 0.0,
    }
}

/// Geometric annualized return over `len - 1` periods.
///
/// Returns -1.0 when equity is wiped out, 0.0 for fewer than 2 bars.
pub fn annualized_return(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let periods = equity_curve.len().saturating_sub(1);
    if periods == 0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return(equity_curve);
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(periods_per_year / periods as f64) - 1.0
}

/// Annualized standard deviation of per-bar returns.
pub fn volatility(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    std_dev(&period_returns(equity_curve)) * periods_per_year.sqrt()
}

/// Annualized Sharpe ratio from per-bar returns (zero risk-free rate).
///
/// Sharpe = mean(returns) / std(returns) * sqrt(periods_per_year).
/// `None` with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> Option<f64> {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return None;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return None;
    }
    Some(mean_f64(&returns) / std * periods_per_year.sqrt())
}

/// Annualized Sortino ratio (downside deviation only).
///
/// `None` with fewer than 2 returns or no downside.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> Option<f64> {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return None;
    }
    let downside_sq: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return None;
    }
    Some(mean_f64(&returns) / downside_std * periods_per_year.sqrt())
}

/// Calmar ratio: annualized return / max drawdown. `None` without drawdown.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> Option<f64> {
    let dd = max_drawdown(equity_curve);
    if dd <= 0.0 {
        return None;
    }
    Some(annualized_return(equity_curve, periods_per_year) / dd)
}

/// Maximum drawdown as a positive fraction: max_j (1 - equity[j] / peak_j).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max(1.0 - eq / peak);
        }
    }
    max_dd
}

/// Longest number of consecutive bars below the running peak.
pub fn max_drawdown_duration(equity_curve: &[f64]) -> usize {
    let mut peak = f64::NEG_INFINITY;
    let mut current = 0usize;
    let mut longest = 0usize;
    for &eq in equity_curve {
        if eq >= peak {
            peak = eq;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

/// Win rate: fraction of trades with positive net PnL.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
