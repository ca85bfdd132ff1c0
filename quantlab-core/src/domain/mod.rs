//! Domain types for QuantLab

pub mod bar;
pub mod trade;

pub use bar::{Bar, PriceSeries};
pub use trade::{Direction, Trade};
