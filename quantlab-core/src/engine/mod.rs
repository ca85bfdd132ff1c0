//! Backtesting engine: a bar-by-bar simulator for one strategy over one series.
//!
//! Orders decided at bar `i` fill at the open of bar `i+1`; equity is marked
//! at every close. The engine owns all per-run state (account, indicator
//! values), so runs never share mutable state.

pub mod account;
pub mod config;
pub mod cost_model;
pub mod result;
pub mod simulator;

pub use account::{Account, Fill};
pub use config::{EngineConfig, SlippageModel};
pub use cost_model::{CostModel, OrderSide};
pub use result::{BacktestResult, OpenPosition};
pub use simulator::Simulator;
