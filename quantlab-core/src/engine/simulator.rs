//! Bar-by-bar simulator.
//!
//! Per bar `i`:
//! 1. Fill the target queued at bar `i-1` at `bars[i].open`.
//! 2. Mark to market: `equity[i] = cash + signed size · close[i]`.
//! 3. Ask the strategy for a target with a context bounded to `..=i`;
//!    anything other than `Hold` is queued for the next open.
//!
//! A target produced on the last bar has no next open and is dropped.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, trace};

use super::account::{Account, Fill};
use super::config::EngineConfig;
use super::cost_model::CostModel;
use super::result::BacktestResult;
use crate::domain::{Direction, PriceSeries, Trade};
use crate::error::{BacktestError, InsufficientDataError, StrategyRuntimeError};
use crate::indicators::IndicatorValues;
use crate::metrics::PerformanceMetrics;
use crate::params::ParameterSet;
use crate::strategy::{BarContext, Strategy, Target};

/// Runs one strategy over one series. Holds no state between runs, so a
/// single instance can be shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: EngineConfig,
}

impl Simulator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn run(
        &self,
        series: &PriceSeries,
        strategy: &dyn Strategy,
        params: &ParameterSet,
    ) -> Result<BacktestResult, BacktestError> {
        self.config.validate()?;
        if series.is_empty() {
            return Err(InsufficientDataError::new("backtest", 1, 0).into());
        }

        let indicators = prepare(series, strategy, params)?;
        let bars = series.bars();
        let n = bars.len();

        let mut account = Account::new(
            self.config.initial_capital,
            CostModel::from_config(&self.config),
        );
        let mut equity_curve = Vec::with_capacity(n);
        let mut trades = Vec::new();
        let mut pending: Option<Target> = None;

        for (i, bar) in bars.iter().enumerate() {
            if let Some(target) = pending.take() {
                self.execute(&mut account, target, bar.open, i, &mut trades);
            }

            equity_curve.push(account.equity(bar.close));

            let ctx = BarContext::new(bars, &indicators, i);
            let target = match decide(strategy, &ctx, params)? {
                Target::Short if !self.config.allow_short => Target::Flat,
                t => t,
            };
            if i + 1 < n && target != Target::Hold {
                pending = Some(target);
            }
        }

        let final_equity = equity_curve
            .last()
            .copied()
            .unwrap_or(self.config.initial_capital);
        let metrics =
            PerformanceMetrics::compute(&equity_curve, &trades, self.config.periods_per_year);
        debug!(
            strategy = strategy.name(),
            params = %params,
            bars = n,
            trades = trades.len(),
            final_equity,
            "backtest finished"
        );

        Ok(BacktestResult {
            total_return: final_equity / self.config.initial_capital - 1.0,
            max_drawdown: metrics.max_drawdown,
            equity_curve,
            trades,
            metrics,
            initial_capital: self.config.initial_capital,
            final_equity,
            bar_count: n,
            open_position: account.position().cloned(),
        })
    }

    /// Move the account toward `target` at `raw_price`. Reversals close first,
    /// then size the new position from post-close equity.
    fn execute(
        &self,
        account: &mut Account,
        target: Target,
        raw_price: f64,
        index: usize,
        trades: &mut Vec<Trade>,
    ) {
        let wanted = match target {
            Target::Hold => return,
            Target::Flat => None,
            Target::Long => Some(Direction::Long),
            Target::Short => Some(Direction::Short),
        };
        let held = account.direction();
        if held == wanted {
            return;
        }

        if held.is_some() {
            if let Some((trade, fill)) = account.close(raw_price, index) {
                log_fill("exit", &fill);
                trades.push(trade);
            }
        }

        if let Some(direction) = wanted {
            let size = account.entry_size(
                direction,
                raw_price,
                self.config.position_fraction,
                self.config.lot_size,
            );
            if size <= 0.0 {
                trace!(index, ?direction, "entry skipped: size rounds to zero");
                return;
            }
            if let Some(fill) = account.open(direction, size, raw_price, index) {
                log_fill("entry", &fill);
            }
        }
    }
}

fn log_fill(kind: &str, fill: &Fill) {
    trace!(
        kind,
        index = fill.index,
        side = ?fill.side,
        price = fill.price,
        size = fill.size,
        commission = fill.commission,
        "fill"
    );
}

/// Indicator preparation. Validation errors and panics both abort the run as
/// a `StrategyRuntimeError`.
fn prepare(
    series: &PriceSeries,
    strategy: &dyn Strategy,
    params: &ParameterSet,
) -> Result<IndicatorValues, StrategyRuntimeError> {
    let indicators = catch_unwind(AssertUnwindSafe(|| strategy.prepare(series, params)))
        .map_err(|payload| panicked(strategy, payload))?
        .map_err(|e| StrategyRuntimeError::new(strategy.name(), e.to_string()))?;

    if let Some(name) = indicators.misaligned(series.len()) {
        return Err(StrategyRuntimeError::new(
            strategy.name(),
            format!(
                "indicator series `{name}` is not aligned with {} bars",
                series.len()
            ),
        ));
    }
    Ok(indicators)
}

fn decide(
    strategy: &dyn Strategy,
    ctx: &BarContext<'_>,
    params: &ParameterSet,
) -> Result<Target, StrategyRuntimeError> {
    catch_unwind(AssertUnwindSafe(|| strategy.target(ctx, params)))
        .map_err(|payload| panicked(strategy, payload))?
}

fn panicked(strategy: &dyn Strategy, payload: Box<dyn Any + Send>) -> StrategyRuntimeError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    StrategyRuntimeError::new(strategy.name(), format!("panicked: {message}"))
}
