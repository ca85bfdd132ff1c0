//! Engine configuration for a single backtest run.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Slippage applied to every fill, always against the trader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SlippageModel {
    None,
    /// Fraction of price, e.g. 0.001 = 0.1%.
    Fraction(f64),
    /// Basis points of price.
    Bps(f64),
    /// Fixed price offset per unit.
    PerUnit(f64),
}

impl SlippageModel {
    fn amount(&self) -> f64 {
        match *self {
            SlippageModel::None => 0.0,
            SlippageModel::Fraction(v) | SlippageModel::Bps(v) | SlippageModel::PerUnit(v) => v,
        }
    }
}

impl Default for SlippageModel {
    fn default() -> Self {
        SlippageModel::Fraction(0.001)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Charged on both sides, as a fraction of notional.
    pub commission_rate: f64,
    /// Extra charge on sells (stamp duty), as a fraction of notional.
    pub sell_tax_rate: f64,
    pub slippage: SlippageModel,
    /// Fraction of equity committed on each entry, in (0, 1].
    pub position_fraction: f64,
    /// Entry sizes are rounded down to a multiple of this.
    pub lot_size: f64,
    /// When false, `Target::Short` is treated as `Target::Flat`.
    pub allow_short: bool,
    /// Bars per year, used to annualize metrics.
    pub periods_per_year: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            commission_rate: 0.0003,
            sell_tax_rate: 0.001,
            slippage: SlippageModel::default(),
            position_fraction: 0.9,
            lot_size: 100.0,
            allow_short: false,
            periods_per_year: 252.0,
        }
    }
}

impl EngineConfig {
    /// No commission, tax or slippage; unit lots; full position sizing.
    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            commission_rate: 0.0,
            sell_tax_rate: 0.0,
            slippage: SlippageModel::None,
            position_fraction: 1.0,
            lot_size: 1.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ValidationError::new("initial_capital", "must be > 0"));
        }
        non_negative("commission_rate", self.commission_rate)?;
        non_negative("sell_tax_rate", self.sell_tax_rate)?;
        non_negative("slippage", self.slippage.amount())?;
        if !(self.position_fraction > 0.0 && self.position_fraction <= 1.0) {
            return Err(ValidationError::new(
                "position_fraction",
                format!("must be in (0, 1], got {}", self.position_fraction),
            ));
        }
        if !self.lot_size.is_finite() || self.lot_size <= 0.0 {
            return Err(ValidationError::new("lot_size", "must be > 0"));
        }
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(ValidationError::new("periods_per_year", "must be > 0"));
        }
        Ok(())
    }
}

fn non_negative(parameter: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(
            parameter,
            format!("must be finite and >= 0, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_capital, 1_000_000.0);
        assert_eq!(config.slippage, SlippageModel::Fraction(0.001));
        assert!(EngineConfig::frictionless(10_000.0).validate().is_ok());
    }

    #[test]
    fn rejects_each_bad_field() {
        let cases: Vec<(&str, EngineConfig)> = vec![
            ("initial_capital", EngineConfig { initial_capital: 0.0, ..Default::default() }),
            ("commission_rate", EngineConfig { commission_rate: -0.1, ..Default::default() }),
            ("sell_tax_rate", EngineConfig { sell_tax_rate: f64::NAN, ..Default::default() }),
            ("slippage", EngineConfig { slippage: SlippageModel::Bps(-1.0), ..Default::default() }),
            ("position_fraction", EngineConfig { position_fraction: 1.5, ..Default::default() }),
            ("lot_size", EngineConfig { lot_size: 0.0, ..Default::default() }),
            ("periods_per_year", EngineConfig { periods_per_year: 0.0, ..Default::default() }),
        ];
        for (field, config) in cases {
            assert_eq!(config.validate().unwrap_err().parameter, field);
        }
    }

    #[test]
    fn slippage_serde_shape() {
        let json = serde_json::to_string(&SlippageModel::Bps(5.0)).unwrap();
        assert_eq!(json, r#"{"kind":"bps","value":5.0}"#);
        let none: SlippageModel = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, SlippageModel::None);
    }
}
