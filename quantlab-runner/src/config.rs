//! Serializable optimizer configuration, loaded from TOML.
//!
//! ```toml
//! strategy = "dual_ma"
//! search_mode = "grid"
//! worker_count = 4
//! random_seed = 42
//!
//! [score]
//! kind = "sharpe"
//!
//! [engine]
//! initial_capital = 1000000.0
//! slippage = { kind = "fraction", value = 0.001 }
//!
//! [[ranges]]
//! name = "fast_period"
//! min = 5
//! max = 15
//! step = 5
//! ```
//!
//! Every field has a default, so a file only needs what it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use quantlab_core::{BuiltinStrategy, EngineConfig, ParameterRange, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::score::ScoreFunction;
use crate::search::check_ranges;
use crate::walk_forward::WalkForwardConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Search driven by `quantlab optimize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    #[default]
    Grid,
    Random,
    WalkForward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub strategy: BuiltinStrategy,
    pub search_mode: SearchMode,
    pub score: ScoreFunction,
    pub engine: EngineConfig,
    /// Worker threads; 0 lets rayon pick one per core.
    pub worker_count: usize,
    pub random_seed: u64,
    /// Draws for random search (and walk-forward's random inner search).
    pub n_samples: usize,
    /// Wall-clock budget per search. Expiry behaves like cancellation.
    pub timeout_secs: Option<f64>,
    pub walk_forward: WalkForwardConfig,
    pub ranges: Vec<ParameterRange>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            strategy: BuiltinStrategy::DualMa,
            search_mode: SearchMode::Grid,
            score: ScoreFunction::Sharpe,
            engine: EngineConfig::default(),
            worker_count: 4,
            random_seed: 42,
            n_samples: 100,
            timeout_secs: None,
            walk_forward: WalkForwardConfig::default(),
            ranges: Vec::new(),
        }
    }
}

impl OptimizerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: OptimizerConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every field. Ranges may be empty here; searches check them.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.score.validate()?;
        if self.n_samples == 0 {
            return Err(ValidationError::new("n_samples", "must be >= 1"));
        }
        if let Some(t) = self.timeout_secs {
            if !t.is_finite() || t <= 0.0 {
                return Err(ValidationError::new(
                    "timeout_secs",
                    format!("must be finite and > 0, got {t}"),
                ));
            }
        }
        self.walk_forward.validate()?;
        if !self.ranges.is_empty() {
            check_ranges(&self.ranges)?;
        }
        Ok(())
    }

    /// `None` when unset or too large for a `Duration`.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .and_then(|t| Duration::try_from_secs_f64(t).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk_forward::InnerSearch;
    use quantlab_core::SlippageModel;

    #[test]
    fn empty_file_gives_defaults() {
        let config = OptimizerConfig::from_toml_str("").unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert_eq!(config.engine.initial_capital, 1_000_000.0);
        assert_eq!(config.engine.commission_rate, 0.0003);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.score, ScoreFunction::Sharpe);
    }

    #[test]
    fn parses_full_file() {
        let text = r#"
            strategy = "macd"
            search_mode = "walk_forward"
            worker_count = 2
            random_seed = 7
            n_samples = 25
            timeout_secs = 1.5

            [score]
            kind = "composite"
            sharpe = 1.0
            total_return = 1.0

            [engine]
            initial_capital = 50000.0
            allow_short = true
            slippage = { kind = "bps", value = 5.0 }

            [walk_forward]
            train_window = 120
            test_window = 40
            step = 40
            inner = "random"

            [[ranges]]
            name = "fast_period"
            min = 5
            max = 15
            step = 5

            [[ranges]]
            name = "slow_period"
            min = 20
            max = 30
            step = 10
        "#;
        let config = OptimizerConfig::from_toml_str(text).unwrap();
        assert_eq!(config.strategy, BuiltinStrategy::Macd);
        assert_eq!(config.search_mode, SearchMode::WalkForward);
        assert_eq!(config.engine.slippage, SlippageModel::Bps(5.0));
        assert!(config.engine.allow_short);
        assert_eq!(config.engine.lot_size, 100.0);
        assert_eq!(config.walk_forward.inner, InnerSearch::Random);
        assert_eq!(config.ranges.len(), 2);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        match config.score {
            ScoreFunction::Composite(w) => {
                assert_eq!(w.sharpe, 1.0);
                assert_eq!(w.win_rate, 0.15);
            }
            other => panic!("unexpected score {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_values() {
        let bad_capital = "[engine]\ninitial_capital = -1.0";
        assert!(matches!(
            OptimizerConfig::from_toml_str(bad_capital),
            Err(ConfigError::Validation(e)) if e.parameter == "initial_capital"
        ));

        let bad_range = "[[ranges]]\nname = \"a\"\nmin = 5\nmax = 1\nstep = 1";
        assert!(matches!(
            OptimizerConfig::from_toml_str(bad_range),
            Err(ConfigError::Parse(_))
        ));

        let dup = "[[ranges]]\nname = \"a\"\nmin = 1\nmax = 2\nstep = 1\n\
                   [[ranges]]\nname = \"a\"\nmin = 1\nmax = 2\nstep = 1";
        assert!(matches!(
            OptimizerConfig::from_toml_str(dup),
            Err(ConfigError::Validation(e)) if e.parameter == "ranges"
        ));

        assert!(OptimizerConfig::from_toml_str("timeout_secs = 0.0").is_err());
        assert!(OptimizerConfig::from_toml_str("search_mode = \"annealing\"").is_err());
    }

    #[test]
    fn huge_timeout_means_no_deadline() {
        let config = OptimizerConfig::from_toml_str("timeout_secs = 1e300").unwrap();
        assert_eq!(config.timeout_secs, Some(1e300));
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = OptimizerConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
