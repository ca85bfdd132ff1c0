//! Single-instrument account: cash plus at most one open position.
//!
//! Cash flows per fill (P = fill price after slippage, s = size, c = commission):
//! - open long: `cash -= P·s + c`
//! - open short: `cash += P·s - c`
//! - close long: `cash += P·s - c`
//! - close short: `cash -= P·s + c`
//!
//! Equity is always `cash + sign·s·mark`.

use super::cost_model::{CostModel, OrderSide};
use super::result::OpenPosition;
use crate::domain::{Direction, Trade};

/// One executed fill, returned for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub index: usize,
    pub side: OrderSide,
    pub price: f64,
    pub size: f64,
    pub commission: f64,
}

#[derive(Debug, Clone)]
pub struct Account {
    cash: f64,
    position: Option<OpenPosition>,
    cost: CostModel,
}

impl Account {
    pub fn new(initial_cash: f64, cost: CostModel) -> Self {
        Self {
            cash: initial_cash,
            position: None,
            cost,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        self.position.as_ref()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.position.as_ref().map(|p| p.direction)
    }

    /// Mark-to-market equity at `mark`.
    pub fn equity(&self, mark: f64) -> f64 {
        match &self.position {
            Some(p) => self.cash + p.direction.sign() * p.size * mark,
            None => self.cash,
        }
    }

    /// Largest lot-rounded size affordable with `equity · fraction` at `raw_price`.
    pub fn entry_size(
        &self,
        direction: Direction,
        raw_price: f64,
        fraction: f64,
        lot_size: f64,
    ) -> f64 {
        let (fill, _) = self.cost.apply_slippage(raw_price, entry_side(direction));
        let budget = self.equity(raw_price) * fraction;
        if fill <= 0.0 || budget <= 0.0 {
            return 0.0;
        }
        let units = budget / (fill * (1.0 + self.cost.commission_rate));
        (units / lot_size).floor() * lot_size
    }

    /// Open a position. The account must be flat.
    pub fn open(
        &mut self,
        direction: Direction,
        size: f64,
        raw_price: f64,
        index: usize,
    ) -> Option<Fill> {
        if self.position.is_some() || size <= 0.0 {
            return None;
        }
        let side = entry_side(direction);
        let (price, slip) = self.cost.apply_slippage(raw_price, side);
        let commission = self.cost.commission(price, size, side);
        match direction {
            Direction::Long => self.cash -= price * size + commission,
            Direction::Short => self.cash += price * size - commission,
        }
        self.position = Some(OpenPosition {
            direction,
            size,
            entry_index: index,
            entry_price: price,
            entry_commission: commission,
            entry_slippage: slip * size,
        });
        Some(Fill {
            index,
            side,
            price,
            size,
            commission,
        })
    }

    /// Flatten the open position, returning the completed trade.
    pub fn close(&mut self, raw_price: f64, index: usize) -> Option<(Trade, Fill)> {
        let pos = self.position.take()?;
        let side = exit_side(pos.direction);
        let (price, slip) = self.cost.apply_slippage(raw_price, side);
        let commission = self.cost.commission(price, pos.size, side);
        match pos.direction {
            Direction::Long => self.cash += price * pos.size - commission,
            Direction::Short => self.cash -= price * pos.size + commission,
        }
        let total_commission = pos.entry_commission + commission;
        let trade = Trade {
            entry_index: pos.entry_index,
            entry_price: pos.entry_price,
            exit_index: index,
            exit_price: price,
            direction: pos.direction,
            size: pos.size,
            commission: total_commission,
            slippage: pos.entry_slippage + slip * pos.size,
            pnl: pos.direction.sign() * (price - pos.entry_price) * pos.size - total_commission,
        };
        let fill = Fill {
            index,
            side,
            price,
            size: pos.size,
            commission,
        };
        Some((trade, fill))
    }
}

fn entry_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Buy,
        Direction::Short => OrderSide::Sell,
    }
}

fn exit_side(direction: Direction) -> OrderSide {
    match direction {
        Direction::Long => OrderSide::Sell,
        Direction::Short => OrderSide::Buy,
    }
}
