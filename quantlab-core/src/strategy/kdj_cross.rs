//! KDJ oversold/overbought cross.
//!
//! Long when K crosses above D while J is below `oversold`; Short when K
//! crosses below D while J is above `overbought`.

use super::{missing_series, BarContext, Strategy, Target};
use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::{kdj, IndicatorValues};
use crate::params::ParameterSet;

const K: &str = "kdj.k";
const D: &str = "kdj.d";
const J: &str = "kdj.j";

/// # Parameters
/// - `n` (default 9): RSV window
/// - `m1` (default 3), `m2` (default 3): K and D smoothing
/// - `oversold` (default 20), `overbought` (default 80)
#[derive(Debug, Clone, Copy, Default)]
pub struct KdjCross;

impl Strategy for KdjCross {
    fn name(&self) -> &str {
        "kdj"
    }

    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
            .with("n", 9.0)
            .with("m1", 3.0)
            .with("m2", 3.0)
            .with("oversold", 20.0)
            .with("overbought", 80.0)
    }

    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError> {
        let n = params.period_or("n", 9)?;
        let m1 = params.period_or("m1", 3)?;
        let m2 = params.period_or("m2", 3)?;
        let result = kdj(&series.highs(), &series.lows(), &series.closes(), n, m1, m2)
            .map_err(|e| match e.parameter.as_str() {
                "window" => ValidationError::new("n", e.reason),
                "smoothing_k" => ValidationError::new("m1", e.reason),
                "smoothing_d" => ValidationError::new("m2", e.reason),
                _ => e,
            })?;
        let mut iv = IndicatorValues::new();
        iv.insert_kdj("kdj", result);
        Ok(iv)
    }

    fn target(
        &self,
        ctx: &BarContext<'_>,
        params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError> {
        let oversold = params.get_or("oversold", 20.0);
        let overbought = params.get_or("overbought", 80.0);
        if ctx.series(J).is_none() {
            return Err(missing_series(self.name(), J));
        }
        let Some(j) = ctx.value(J) else {
            return Ok(Target::Hold);
        };

        if j < oversold && ctx.crossed_over(K, D) {
            Ok(Target::Long)
        } else if j > overbought && ctx.crossed_under(K, D) {
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

    #[test]
    fn long_from_oversold_region() {
        let series = series_from_closes(&[10.0; 3]);
        let mut iv = IndicatorValues::new();
        iv.insert(K, vec![10.0, 5.0, 12.0]);
        iv.insert(D, vec![11.0, 9.0, 10.0]);
        iv.insert(J, vec![8.0, -3.0, 16.0]);
        let ctx = BarContext::new(series.bars(), &iv, 2);
        assert_eq!(KdjCross.target(&ctx, &ParameterSet::new()).unwrap(), Target::Long);

        // Same cross outside the oversold zone is ignored.
        let strict = ParameterSet::new().with("oversold", 10.0);
        assert_eq!(KdjCross.target(&ctx, &strict).unwrap(), Target::Hold);
    }

    #[test]
    fn short_from_overbought_region() {
        let series = series_from_closes(&[10.0; 2]);
        let mut iv = IndicatorValues::new();
        iv.insert(K, vec![90.0, 84.0]);
        iv.insert(D, vec![85.0, 86.0]);
        iv.insert(J, vec![100.0, 81.0]);
        let ctx = BarContext::new(series.bars(), &iv, 1);
        assert_eq!(KdjCross.target(&ctx, &ParameterSet::new()).unwrap(), Target::Short);
    }

    #[test]
    fn window_error_names_strategy_parameter() {
        let series = series_from_closes(&[10.0; 5]);
        let p = ParameterSet::new().with("n", 9.0);
        assert_eq!(KdjCross.prepare(&series, &p).unwrap_err().parameter, "n");
    }
}
