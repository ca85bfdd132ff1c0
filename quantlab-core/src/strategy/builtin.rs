//! Built-in strategies selected by name at configuration time.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{BollTouch, DualMa, KdjCross, MacdCross, RsiThreshold, Strategy};
use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStrategy {
    DualMa,
    Macd,
    Kdj,
    Rsi,
    Boll,
}

impl BuiltinStrategy {
    pub const ALL: [BuiltinStrategy; 5] = [
        BuiltinStrategy::DualMa,
        BuiltinStrategy::Macd,
        BuiltinStrategy::Kdj,
        BuiltinStrategy::Rsi,
        BuiltinStrategy::Boll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinStrategy::DualMa => "dual_ma",
            BuiltinStrategy::Macd => "macd",
            BuiltinStrategy::Kdj => "kdj",
            BuiltinStrategy::Rsi => "rsi",
            BuiltinStrategy::Boll => "boll",
        }
    }

    /// Shareable strategy instance.
    pub fn build(self) -> Arc<dyn Strategy> {
        match self {
            BuiltinStrategy::DualMa => Arc::new(DualMa),
            BuiltinStrategy::Macd => Arc::new(MacdCross),
            BuiltinStrategy::Kdj => Arc::new(KdjCross),
            BuiltinStrategy::Rsi => Arc::new(RsiThreshold),
            BuiltinStrategy::Boll => Arc::new(BollTouch),
        }
    }
}

impl fmt::Display for BuiltinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|b| b.name()).collect();
                ValidationError::new(
                    "strategy",
                    format!("unknown strategy `{s}` (known: {})", known.join(", ")),
                )
            })
    }
}
