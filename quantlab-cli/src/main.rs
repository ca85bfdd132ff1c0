//! QuantLab CLI — backtest, optimize, and sensitivity commands.
//!
//! Commands:
//! - `backtest` — run one strategy with one parameter set over a CSV file
//! - `optimize` — grid, random, or walk-forward search from a TOML config
//! - `sensitivity` — sweep one configured range around the strategy defaults
//!
//! Logs go to stderr; set `RUST_LOG` to change the level (default `info`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quantlab_core::{BacktestResult, BuiltinStrategy, ParameterSet, Simulator};
use quantlab_runner::export::{save_backtest, save_report};
use quantlab_runner::{
    load_csv, OptimizationReport, Optimizer, OptimizerConfig, SearchMode, SensitivityCurve,
    WalkForwardResult,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "quantlab", about = "QuantLab CLI — backtesting and parameter optimization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest.
    Backtest {
        /// CSV file with timestamp/date, open, high, low, close, volume columns.
        #[arg(long)]
        data: PathBuf,

        /// Built-in strategy: dual_ma, macd, kdj, rsi, boll.
        #[arg(long)]
        strategy: Option<String>,

        /// Parameter override as NAME=VALUE; repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, f64)>,

        /// TOML config supplying the strategy and engine settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for backtest.json, trades.csv and equity.csv.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Search parameter ranges from a TOML config.
    Optimize {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        config: PathBuf,

        /// Override the config's search mode.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Rows shown in the summary table.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Directory for report.json and results.csv (or walk_forward.json).
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Sweep one configured range with every other parameter at its default.
    Sensitivity {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        config: PathBuf,

        /// Name of the range to sweep.
        #[arg(long)]
        param: String,

        /// Write the curve as JSON here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Grid,
    Random,
    WalkForward,
}

impl From<ModeArg> for SearchMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Grid => SearchMode::Grid,
            ModeArg::Random => SearchMode::Random,
            ModeArg::WalkForward => SearchMode::WalkForward,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            data,
            strategy,
            params,
            config,
            output_dir,
        } => run_backtest_cmd(&data, strategy, params, config, output_dir),
        Commands::Optimize {
            data,
            config,
            mode,
            top,
            output_dir,
        } => run_optimize_cmd(&data, &config, mode, top, &output_dir),
        Commands::Sensitivity {
            data,
            config,
            param,
            output,
        } => run_sensitivity_cmd(&data, &config, &param, output),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value for `{name}`: {e}"))?;
    Ok((name.trim().to_string(), value))
}

fn load_config(path: Option<&Path>) -> Result<OptimizerConfig> {
    match path {
        Some(p) => OptimizerConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(OptimizerConfig::default()),
    }
}

fn run_backtest_cmd(
    data: &Path,
    strategy: Option<String>,
    overrides: Vec<(String, f64)>,
    config_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path.as_deref())?;
    let builtin = match strategy {
        Some(name) => name.parse::<BuiltinStrategy>()?,
        None => config.strategy,
    };
    let strategy = builtin.build();

    let mut params = strategy.default_params();
    for (name, value) in overrides {
        params.insert(name, value);
    }

    let series = load_csv(data).with_context(|| format!("failed to load {}", data.display()))?;
    info!(strategy = %builtin, bars = series.len(), params = %params, "running backtest");

    let result = Simulator::new(config.engine.clone()).run(&series, strategy.as_ref(), &params)?;
    print_backtest(builtin, &params, &result, &config);

    if let Some(dir) = output_dir {
        let dir = save_backtest(&result, &dir)?;
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn run_optimize_cmd(
    data: &Path,
    config_path: &Path,
    mode: Option<ModeArg>,
    top: usize,
    output_dir: &Path,
) -> Result<()> {
    let config = load_config(Some(config_path))?;
    if config.ranges.is_empty() {
        bail!("config {} defines no [[ranges]]", config_path.display());
    }
    let mode = mode.map(SearchMode::from).unwrap_or(config.search_mode);
    let series = load_csv(data).with_context(|| format!("failed to load {}", data.display()))?;

    let ranges = config.ranges.clone();
    let builtin = config.strategy;
    let score = config.score;
    let n_samples = config.n_samples;
    let wf = config.walk_forward.clone();
    let optimizer = Optimizer::new(builtin.build(), Arc::new(series), config)?;

    match mode {
        SearchMode::Grid | SearchMode::Random => {
            let result = if mode == SearchMode::Grid {
                optimizer.grid_search(&ranges)?
            } else {
                optimizer.random_search(&ranges, n_samples)?
            };
            let report = OptimizationReport::from_result(builtin.name(), &score, &result);
            println!();
            println!("=== Optimization ({}, score: {}) ===", builtin, score);
            println!(
                "Status: {:?}  evaluated {}/{}  failed {}  {:.2}s",
                result.status,
                result.evaluated,
                result.total,
                result.failed.len(),
                result.elapsed_secs
            );
            if result.timed_out {
                println!("WARNING: search stopped by timeout");
            }
            if let (Some(params), Some(best)) = (&result.best_params, result.best_result()) {
                println!(
                    "Best: {params}  return {:.2}%  max DD {:.2}%  trades {}  win rate {:.1}%",
                    best.total_return * 100.0,
                    best.max_drawdown * 100.0,
                    best.trade_count(),
                    best.win_rate() * 100.0
                );
            }
            println!();
            print!("{}", report.summary_table(top));
            let dir = save_report(&report, output_dir)?;
            println!();
            println!("Report saved to: {}", dir.display());
        }
        SearchMode::WalkForward => {
            let result = optimizer.walk_forward(&ranges, &wf)?;
            print_walk_forward(&result);
            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            let path = output_dir.join("walk_forward.json");
            std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
            println!("Report saved to: {}", path.display());
        }
    }
    Ok(())
}

fn run_sensitivity_cmd(
    data: &Path,
    config_path: &Path,
    param: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(Some(config_path))?;
    let Some(target) = config.ranges.iter().find(|r| r.name() == param).cloned() else {
        bail!("no range named `{param}` in {}", config_path.display());
    };
    let series = load_csv(data).with_context(|| format!("failed to load {}", data.display()))?;
    let strategy = config.strategy.build();
    let base = strategy.default_params();
    let optimizer = Optimizer::new(strategy, Arc::new(series), config)?;

    let curve = optimizer.sensitivity_analysis(&base, &target)?;
    print_sensitivity(&curve);
    if let Some(path) = output {
        std::fs::write(&path, serde_json::to_string_pretty(&curve)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Curve saved to: {}", path.display());
    }
    Ok(())
}

fn fmt_ratio(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}"))
}

fn print_backtest(
    strategy: BuiltinStrategy,
    params: &ParameterSet,
    result: &BacktestResult,
    config: &OptimizerConfig,
) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {strategy} ({params})");
    println!("Bars:           {}", result.bar_count);
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", result.initial_capital);
    println!("Final Equity:   {:.2}", result.final_equity);
    println!("Total Return:   {:.2}%", result.total_return * 100.0);
    println!("Annualized:     {:.2}%", m.annualized_return * 100.0);
    println!("Volatility:     {:.2}%", m.volatility * 100.0);
    println!("Sharpe:         {}", fmt_ratio(m.sharpe));
    println!("Sortino:        {}", fmt_ratio(m.sortino));
    println!("Calmar:         {}", fmt_ratio(m.calmar));
    println!("Max Drawdown:   {:.2}%", result.max_drawdown * 100.0);
    println!("DD Duration:    {} bars", m.max_drawdown_duration);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Score ({}): {:.4}", config.score, config.score.score(result));
    if let Some(open) = &result.open_position {
        println!();
        println!(
            "Open position:  {:?} {} @ {:.4} since bar {}",
            open.direction, open.size, open.entry_price, open.entry_index
        );
    }
    println!();
}

fn print_walk_forward(result: &WalkForwardResult) {
    println!();
    println!("=== Walk-Forward ===");
    for fold in &result.folds {
        println!(
            "fold {:>2}  train [{}, {})  test [{}, {})  train {}  test {}  {}",
            fold.spec.fold_index,
            fold.spec.train_start,
            fold.spec.train_end,
            fold.spec.test_start,
            fold.spec.test_end,
            fmt_ratio(fold.train_score),
            fmt_ratio(fold.test_score),
            fold.best_params
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
        );
    }
    println!();
    println!("Status:          {:?}", result.status);
    println!("Mean train:      {}", fmt_ratio(result.mean_train_score));
    println!("Mean test (OOS): {}", fmt_ratio(result.mean_test_score));
    if result.sentinel_train_folds + result.sentinel_test_folds > 0 {
        println!(
            "Sentinel folds:  {} train, {} test (excluded from means)",
            result.sentinel_train_folds, result.sentinel_test_folds
        );
    }
    println!(
        "Degradation:     {} ({:?})",
        fmt_ratio(result.degradation_ratio),
        result.degradation_flag
    );
    if result.timed_out {
        println!("WARNING: walk-forward stopped by timeout");
    }
    println!();
}

fn print_sensitivity(curve: &SensitivityCurve) {
    println!();
    println!("=== Sensitivity: {} (base: {}) ===", curve.parameter, curve.base_params);
    for point in &curve.points {
        println!("{:>12.4}  {:>12.4}", point.value, point.score);
    }
    println!();
    if let Some(best) = curve.best_point() {
        println!("Best value:   {} (score {:.4})", best.value, best.score);
    }
    println!("Score spread: {}", fmt_ratio(curve.score_spread()));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_param_pairs() {
        assert_eq!(parse_param("fast_period=5").unwrap(), ("fast_period".into(), 5.0));
        assert_eq!(parse_param(" k = 2.5 ").unwrap(), ("k".into(), 2.5));
        assert!(parse_param("fast_period").is_err());
        assert!(parse_param("fast_period=abc").is_err());
    }

    #[test]
    fn cli_parses_commands() {
        let cli = Cli::try_parse_from([
            "quantlab",
            "backtest",
            "--data",
            "bars.csv",
            "--strategy",
            "macd",
            "--param",
            "fast_period=8",
            "--param",
            "slow_period=21",
        ])
        .unwrap();
        match cli.command {
            Commands::Backtest { params, .. } => assert_eq!(params.len(), 2),
            _ => panic!("expected backtest"),
        }

        let cli = Cli::try_parse_from([
            "quantlab",
            "optimize",
            "--data",
            "bars.csv",
            "--config",
            "opt.toml",
            "--mode",
            "walk-forward",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Optimize {
                mode: Some(ModeArg::WalkForward),
                ..
            }
        ));
    }
}
