//! RSI threshold re-entry.
//!
//! Long when RSI climbs back to `oversold` from below; Short when it falls
//! back to `overbought` from above.

use super::{missing_series, BarContext, Strategy, Target};
use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::{rsi, IndicatorValues};
use crate::params::ParameterSet;

const RSI: &str = "rsi";

/// # Parameters
/// - `period` (default 14)
/// - `oversold` (default 30), `overbought` (default 70)
#[derive(Debug, Clone, Copy, Default)]
pub struct RsiThreshold;

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        "rsi"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("period", 14.0)
            .with("oversold", 30.0)
            .with("overbought", 70.0)
    }

    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        let period = params.period_or("period", 14)?;
        let oversold = params.get_or("oversold", 30.0);
        let overbought = params.get_or("overbought", 70.0);
        if oversold >= overbought {
            return Err(ValidationError::new(
                "oversold",
                format!("oversold ({oversold}) must be < overbought ({overbought})"),
            ));
        }
        let values = rsi(&series.closes(), period)
            .map_err(|e| ValidationError::new("period", e.reason))?;
        let mut iv = IndicatorValues::new();
        iv.insert(RSI, values);
        Ok(iv)
    }

    fn target(
        &self,
        ctx: &BarContext<'_>,
        params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        let oversold = params.get_or("oversold", 30.0);
        let overbought = params.get_or("overbought", 70.0);
        if ctx.series(RSI).is_none() {
            return Err(missing_series(self.name(), RSI));
        }
        let (Some(prev), Some(cur)) = (ctx.value_back(RSI, 1), ctx.value(RSI)) else {
            return Ok(Target::Hold);
        };

        if prev < oversold && cur >= oversold {
            Ok(Target::Long)
        } else if prev > overbought && cur <= overbought {
            Ok(Target::Short)
        } else {
            Ok(Target::Hold)
        }
    }
}
