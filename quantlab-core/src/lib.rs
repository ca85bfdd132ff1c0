//! QuantLab Core — domain types, indicator engine, strategies, backtest simulator.
//!
//! This crate contains everything needed to evaluate one parameter set:
//! - Domain types (bars, price series, trades)
//! - Causal indicator functions over `&[f64]`
//! - The `Strategy` capability trait and the built-in strategies
//! - Bar-by-bar simulator with next-bar-open fills
//! - Performance metrics over equity curves and trade lists

pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod params;
pub mod strategy;

pub use domain::{Bar, Direction, PriceSeries, Trade};
pub use engine::{BacktestResult, EngineConfig, OpenPosition, SlippageModel, Simulator};
pub use error::{BacktestError, InsufficientDataError, StrategyRuntimeError, ValidationError};
pub use indicators::{IndicatorValues, UNDEFINED};
pub use metrics::PerformanceMetrics;
pub use params::{ParameterRange, ParameterSet};
pub use strategy::{BarContext, BuiltinStrategy, Strategy, Target};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a worker thread touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<ParameterSet>();
        require_sync::<ParameterSet>();
        require_send::<ParameterRange>();
        require_sync::<ParameterRange>();
        require_send::<Simulator>();
        require_sync::<Simulator>();
        require_send::<BacktestResult>();
        require_sync::<BacktestResult>();
        require_send::<BacktestError>();
        require_sync::<BacktestError>();
        require_send::<std::sync::Arc<dyn Strategy>>();
        require_sync::<std::sync::Arc<dyn Strategy>>();
    }

    #[test]
    fn builtin_strategies_run_on_a_short_series() {
        let closes: Vec<f64> = (0..120)
            .map(|i| 100.0 + (i as f64 * 0.2).sin() * 8.0 + i as f64 * 0.05)
            .collect();
        let series = strategy::test_support::series_from_closes(&closes);
        let sim = Simulator::new(EngineConfig::default());
        for builtin in BuiltinStrategy::ALL {
            let strat = builtin.build();
            let result = sim
                .run(&series, strat.as_ref(), &strat.default_params())
                .unwrap();
            assert_eq!(result.equity_curve.len(), 120);
            assert_eq!(result.bar_count, 120);
        }
    }
}
