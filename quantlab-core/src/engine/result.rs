//! Backtest output.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Trade};
use crate::metrics::PerformanceMetrics;

/// Position still held after the last bar. Marked to market in the equity
/// curve but never counted as a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub direction: Direction,
    pub size: f64,
    pub entry_index: usize,
    pub entry_price: f64,
    pub entry_commission: f64,
    pub entry_slippage: f64,
}

impl OpenPosition {
    /// Unrealized PnL at `mark`, net of the entry commission.
    pub fn unrealized_pnl(&self, mark: f64) -> f64 {
        self.direction.sign() * (mark - self.entry_price) * self.size - self.entry_commission
    }
}

/// Result of a single simulator run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// One mark-to-market equity point per bar.
    pub equity_curve: Vec<f64>,
    pub trades: Vec<Trade>,
    pub total_return: f64,
    /// Positive fraction.
    pub max_drawdown: f64,
    pub metrics: PerformanceMetrics,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub bar_count: usize,
    pub open_position: Option<OpenPosition>,
}

impl BacktestResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn win_rate(&self) -> f64 {
        self.metrics.win_rate
    }
}
