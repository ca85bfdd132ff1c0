//! Cost model: slippage, commission and sell-side tax.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Commission is a symmetric fraction of notional; sells additionally pay `sell_tax_rate`.

use super::config::{EngineConfig, SlippageModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone)]
pub struct CostModel {
    pub slippage: SlippageModel,
    pub commission_rate: f64,
    pub sell_tax_rate: f64,
}

impl CostModel {
    pub fn new(slippage: SlippageModel, commission_rate: f64, sell_tax_rate: f64) -> Self {
        Self {
            slippage,
            commission_rate,
            sell_tax_rate,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.slippage, config.commission_rate, config.sell_tax_rate)
    }

    pub fn frictionless() -> Self {
        Self::new(SlippageModel::None, 0.0, 0.0)
    }

    /// Apply slippage to a raw fill price.
    ///
    /// Returns `(slipped_price, slippage_per_unit)`; the per-unit amount is
    /// always non-negative.
    pub fn apply_slippage(&self, raw_price: f64, side: OrderSide) -> (f64, f64) {
        let per_unit = match self.slippage {
            SlippageModel::None => 0.0,
            SlippageModel::Fraction(f) => raw_price * f,
            SlippageModel::Bps(b) => raw_price * b / 10_000.0,
            SlippageModel::PerUnit(p) => p,
        };
        let price = match side {
            OrderSide::Buy => raw_price + per_unit,
            OrderSide::Sell => (raw_price - per_unit).max(0.0),
        };
        (price, (price - raw_price).abs())
    }

    /// Commission (plus tax on sells) for a fill.
    pub fn commission(&self, fill_price: f64, quantity: f64, side: OrderSide) -> f64 {
        let rate = match side {
            OrderSide::Buy => self.commission_rate,
            OrderSide::Sell => self.commission_rate + self.sell_tax_rate,
        };
        fill_price * quantity * rate
    }
}
