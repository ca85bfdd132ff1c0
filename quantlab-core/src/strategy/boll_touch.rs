//! Bollinger band touch: buy at the lower band, exit at the upper band.

use super::{missing_series, BarContext, Strategy, Target};
use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::{boll, IndicatorValues};
use crate::params::ParameterSet;

const UPPER: &str = "boll.upper";
const LOWER: &str = "boll.lower";

/// # Parameters
/// - `period` (default 20)
/// - `std_dev` (default 2.0)
#[derive(Debug, Clone, Copy, Default)]
pub struct BollTouch;

impl Strategy for BollTouch {
    fn name(&self) -> &str {
        "boll"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("period", 20.0)
            .with("std_dev", 2.0)
    }

    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        let period = params.period_or("period", 20)?;
        let std_dev = params.get_or("std_dev", 2.0);
        let bands = boll(&series.closes(), period, std_dev).map_err(|e| {
            let name = if e.parameter == "window" { "period" } else { "std_dev" };
            ValidationError::new(name, e.reason)
        })?;
        let mut iv = IndicatorValues::new();
        iv.insert_boll("boll", bands);
        Ok(iv)
    }

    fn target(
        &self,
        ctx: &BarContext<'_>,
        _params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        if ctx.series(UPPER).is_none() || ctx.series(LOWER).is_none() {
            return Err(missing_series(self.name(), UPPER));
        }
        let (Some(bar), Some(upper), Some(lower)) = (ctx.bar(), ctx.value(UPPER), ctx.value(LOWER))
        else {
            return Ok(Target::Hold);
        };

        if bar.close <= lower {
            Ok(Target::Long)
        } else if bar.close >= upper {
            Ok(Target::Short)
        } else {
            Ok(Target::Hold)
        }
    }
}
