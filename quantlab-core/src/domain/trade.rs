//! Trade — a completed round trip, created when the simulator closes a position.

use serde::{Deserialize, Serialize};

/// Side of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// A closed round trip: entry → exit.
///
/// Prices are fill prices after slippage. `commission` covers both legs
/// (including any sell-side tax) and `pnl` is net of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_index: usize,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_price: f64,
    pub direction: Direction,
    pub size: f64,
    pub commission: f64,
    pub slippage: f64,
    pub pnl: f64,
}

impl Trade {
    /// Gross PnL before commission.
    pub fn gross_pnl(&self) -> f64 {
        self.direction.sign() * (self.exit_price - self.entry_price) * self.size
    }

    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.size;
        if notional == 0.0 {
            return 0.0;
        }
        self.pnl / notional
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index.saturating_sub(self.entry_index)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
