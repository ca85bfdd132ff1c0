//! Strategy capability interface.
//!
//! A strategy turns market state plus a `ParameterSet` into a desired
//! position target. It is stateless across calls: parameters arrive with
//! every call, indicator series are computed once per run by `prepare` and
//! owned by the simulator for that run. Strategies are shared across worker
//! threads behind `Arc<dyn Strategy>`.
//!
//! # Architecture invariant
//! Strategies never see portfolio state or bars beyond the current one.
//! `target` receives a `BarContext` bounded to `bars[..=index]`.

pub mod boll_touch;
pub mod builtin;
pub mod context;
pub mod dual_ma;
pub mod kdj_cross;
pub mod macd_cross;
pub mod rsi_threshold;

pub use boll_touch::BollTouch;
pub use builtin::BuiltinStrategy;
pub use context::BarContext;
pub use dual_ma::DualMa;
pub use kdj_cross::KdjCross;
pub use macd_cross::MacdCross;
pub use rsi_threshold::RsiThreshold;

use serde::{Deserialize, Serialize};

use crate::domain::PriceSeries;
use crate::error::{StrategyRuntimeError, ValidationError};
use crate::indicators::IndicatorValues;
use crate::params::ParameterSet;

/// Desired position after the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Long,
    Short,
    Flat,
    /// Keep whatever is held.
    Hold,
}

pub trait Strategy: Send + Sync {
    /// Stable identifier, e.g. `"dual_ma"`.
    fn name(&self) -> &str;

    /// Parameters and their defaults. Absent parameters fall back to these.
    fn default_params(&self) -> ParameterSet {
        ParameterSet::new()
    }

    /// Compute every indicator series the strategy reads, once per run.
    ///
    /// Series must be aligned with `series` (same length).
    fn prepare(
        &self,
        series: &PriceSeries,
        params: &ParameterSet,
    ) -> Result<IndicatorValues, ValidationError>;

    /// Decide the target position at `ctx.index()`.
    fn target(
        &self,
        ctx: &BarContext<'_>,
        params: &ParameterSet,
    ) -> Result<Target, StrategyRuntimeError>;
}

/// Error for an indicator series a strategy expected but did not prepare.
pub(crate) fn missing_series(strategy: &str, name: &str) -> StrategyRuntimeError {
    StrategyRuntimeError::new(strategy, format!("indicator series `{name}` not prepared"))
}
