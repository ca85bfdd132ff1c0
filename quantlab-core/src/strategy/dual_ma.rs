//! Dual moving average crossover: golden cross and death cross.
//!
//! Targets Long when the fast MA crosses above the slow MA (golden cross).
//! Targets Short when the fast MA crosses below the slow MA (death cross);
//! the simulator treats that as Flat unless shorting is enabled.

use super::{missing_series, BarContext, Strategy, Target};
use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::{ma, IndicatorValues};
use crate::params::ParameterSet;

const FAST: &str = "ma.fast";
const SLOW: &str = "ma.slow";

/// # Parameters
/// - `fast_period` (default 5)
/// - `slow_period` (default 20), must exceed `fast_period`
#[derive(Debug, Clone, Copy, Default)]
pub struct DualMa;

impl DualMa {
    fn periods(params: &ParameterSet) -> Result<(usize, usize), ValidationError> {
        let fast = params.period_or("fast_period", 5)?;
        let slow = params.period_or("slow_period", 20)?;
        if slow <= fast {
            return Err(ValidationError::new(
                "slow_period",
                format!("slow_period ({slow}) must be > fast_period ({fast})"),
            ));
        }
        Ok((fast, slow))
    }
}

impl Strategy for DualMa {
    fn name(&self) -> &str {
        "dual_ma"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("fast_period", 5.0)
            .with("slow_period", 20.0)
    }

    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        let (fast, slow) = Self::periods(params)?;
        let closes = series.closes();
        let mut iv = IndicatorValues::new();
        iv.insert(FAST, ma(&closes, fast)?);
        iv.insert(SLOW, ma(&closes, slow)?);
        Ok(iv)
    }

    fn target(
        &self,
        ctx: &BarContext<'_>,
        _params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        if ctx.series(FAST).is_none() {
            return Err(missing_series(self.name(), FAST));
        }
        if ctx.crossed_over(FAST, SLOW) {
            Ok(Target::Long)
        } else if ctx.crossed_under(FAST, SLOW) {
            Ok(Target::Short)
        } else {
            Ok(Target::Hold)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::series_from_closes;

    fn params(fast: f64, slow: f64) -> ParameterSet {
        ParameterSet::new()
            .with("fast_period", fast)
            .with("slow_period", slow)
    }

    #[test]
    fn golden_then_death_cross() {
        // Down, then up, then down again.
        let closes = [10.0, 9.0, 8.0, 7.0, 9.0, 11.0, 13.0, 11.0, 9.0, 7.0];
        let series = series_from_closes(&closes);
        let p = params(2.0, 3.0);
        let iv = DualMa.prepare(&series, &p).unwrap();

        let targets: Vec<Target> = (0..closes.len())
            .map(|i| {
                DualMa
                    .target(&BarContext::new(series.bars(), &iv, i), &p)
                    .unwrap()
            })
            .collect();
        let first_long = targets.iter().position(|t| *t == Target::Long).unwrap();
        let first_short = targets.iter().position(|t| *t == Target::Short).unwrap();
        assert!(first_long < first_short);
        assert_eq!(targets.iter().filter(|t| **t == Target::Long).count(), 1);
    }

    #[test]
    fn rejects_inverted_periods() {
        let series = series_from_closes(&[1.0; 30]);
        let err = DualMa.prepare(&series, &params(20.0, 5.0)).unwrap_err();
        assert_eq!(err.parameter, "slow_period");
    }

    #[test]
    fn rejects_window_longer_than_series() {
        let series = series_from_closes(&[1.0; 10]);
        assert!(DualMa.prepare(&series, &params(5.0, 20.0)).is_err());
    }

    #[test]
    fn defaults_apply_when_absent() {
        let series = series_from_closes(&[1.0; 25]);
        let iv = DualMa.prepare(&series, &ParameterSet::new()).unwrap();
        assert!(iv.get(SLOW, 18).unwrap().is_nan());
        assert_eq!(iv.get(SLOW, 19), Some(1.0));
    }

    #[test]
    fn missing_preparation_is_a_runtime_error() {
        let series = series_from_closes(&[1.0; 3]);
        let iv = IndicatorValues::new();
        let ctx = BarContext::new(series.bars(), &iv, 2);
        assert!(DualMa.target(&ctx, &ParameterSet::new()).is_err());
    }
}
