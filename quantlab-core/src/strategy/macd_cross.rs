//! MACD cross: DIF crossing its DEA signal line.

use super::{missing_series, BarContext, Strategy, Target};
use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::{macd, IndicatorValues};
use crate::params::ParameterSet;

const DIF: &str = "macd.dif";
const DEA: &str = "macd.dea";

/// # Parameters
/// - `fast_period` (default 12)
/// - `slow_period` (default 26)
/// - `signal_period` (default 9)
#[derive(Debug, Clone, Copy, Default)]
pub struct MacdCross;

impl Strategy for MacdCross {
    fn name(&self) -> &str {
        "macd"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("fast_period", 12.0)
            .with("slow_period", 26.0)
            .with("signal_period", 9.0)
    }

    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        let fast = params.period_or("fast_period", 12)?;
        let slow = params.period_or("slow_period", 26)?;
        let signal = params.period_or("signal_period", 9)?;
        if slow <= fast {
            return Err(ValidationError::new(
                "slow_period",
                format!("slow_period ({slow}) must be > fast_period ({fast})"),
            ));
        }
        let mut iv = IndicatorValues::new();
        iv.insert_macd("macd", macd(&series.closes(), fast, slow, signal)?);
        Ok(iv)
    }

    fn target(
        &self,
        ctx: &BarContext<'_>,
        _params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        if ctx.series(DIF).is_none() || ctx.series(DEA).is_none() {
            return Err(missing_series(self.name(), DIF));
        }
        if ctx.crossed_over(DIF, DEA) {
            Ok(Target::Long)
        } else if ctx.crossed_under(DIF, DEA) {
            Ok(Target::Short)
        } else {
            Ok(Target::Hold)
        }
    }
}
