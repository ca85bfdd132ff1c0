//! Report export — JSON and CSV artifacts for optimization and backtest runs.
//!
//! An `OptimizationReport` flattens an `OptimizationResult` into ranked rows
//! (best first) keyed by the parameter-set fingerprint. JSON reports carry a
//! `schema_version`; newer versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use quantlab_core::{BacktestResult, ParameterSet, Trade};
use serde::{Deserialize, Serialize};

use crate::result::{OptimizationResult, SearchStatus};
use crate::score::ScoreFunction;

pub const SCHEMA_VERSION: u32 = 1;

/// One evaluated parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub fingerprint: String,
    pub params: ParameterSet,
    /// `None` for failed runs.
    pub score: Option<f64>,
    pub total_return: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub sharpe: Option<f64>,
    pub win_rate: Option<f64>,
    pub trade_count: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub schema_version: u32,
    pub strategy: String,
    pub score_function: String,
    pub status: SearchStatus,
    pub timed_out: bool,
    pub total: usize,
    pub evaluated: usize,
    pub duplicate_samples: usize,
    pub best_params: Option<ParameterSet>,
    pub best_score: Option<f64>,
    pub elapsed_secs: f64,
    pub rows: Vec<ReportRow>,
}

impl OptimizationReport {
    pub fn from_result(strategy: &str, score: &ScoreFunction, result: &OptimizationResult) -> Self {
        let rows = result
            .ranked()
            .into_iter()
            .enumerate()
            .map(|(i, (params, evaluation))| {
                let backtest = evaluation.result();
                ReportRow {
                    rank: i + 1,
                    fingerprint: params.fingerprint(),
                    params: params.clone(),
                    score: backtest.map(|_| evaluation.score),
                    total_return: backtest.map(|r| r.total_return),
                    max_drawdown: backtest.map(|r| r.max_drawdown),
                    sharpe: backtest.and_then(|r| r.metrics.sharpe),
                    win_rate: backtest.map(BacktestResult::win_rate),
                    trade_count: backtest.map(BacktestResult::trade_count),
                    error: evaluation.error().map(str::to_string),
                }
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION,
            strategy: strategy.to_string(),
            score_function: score.name().to_string(),
            status: result.status,
            timed_out: result.timed_out,
            total: result.total,
            evaluated: result.evaluated,
            duplicate_samples: result.duplicate_samples,
            best_params: result.best_params.clone(),
            best_score: result.best_score,
            elapsed_secs: result.elapsed_secs,
            rows,
        }
    }

    /// The first `n` rows as an aligned text table.
    pub fn summary_table(&self, n: usize) -> String {
        let mut out = format!(
            "{:>4}  {:<16}  {:>12}  {:>10}  {:>8}  {:>7}  {}\n",
            "rank", "fingerprint", "score", "return", "max_dd", "trades", "params"
        );
        for row in self.rows.iter().take(n) {
            out.push_str(&format!(
                "{:>4}  {:<16}  {:>12}  {:>10}  {:>8}  {:>7}  {}\n",
                row.rank,
                row.fingerprint,
                row.score.map_or_else(|| "failed".to_string(), |s| format!("{s:.4}")),
                opt_pct(row.total_return),
                opt_pct(row.max_drawdown),
                row.trade_count.map_or_else(|| "-".to_string(), |c| c.to_string()),
                row.params,
            ));
        }
        out
    }
}

fn opt_pct(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn opt_f64(v: Option<f64>) -> String {
    v.map_or_else(String::new, |v| format!("{v:.6}"))
}

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_report_json(report: &OptimizationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

/// Deserialize a report, rejecting schema versions newer than this build.
pub fn import_report_json(json: &str) -> Result<OptimizationReport> {
    let report: OptimizationReport =
        serde_json::from_str(json).context("failed to deserialize report from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_backtest_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Columns: rank, fingerprint, params, score, total_return, max_drawdown,
/// sharpe, win_rate, trade_count, error. Empty cells mark failed runs.
pub fn export_report_csv(report: &OptimizationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "fingerprint",
        "params",
        "score",
        "total_return",
        "max_drawdown",
        "sharpe",
        "win_rate",
        "trade_count",
        "error",
    ])?;
    for row in &report.rows {
        wtr.write_record([
            &row.rank.to_string(),
            &row.fingerprint,
            &row.params.to_string(),
            &opt_f64(row.score),
            &opt_f64(row.total_return),
            &opt_f64(row.max_drawdown),
            &opt_f64(row.sharpe),
            &opt_f64(row.win_rate),
            &row.trade_count.map_or_else(String::new, |c| c.to_string()),
            row.error.as_deref().unwrap_or(""),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "direction",
        "entry_index",
        "entry_price",
        "exit_index",
        "exit_price",
        "size",
        "commission",
        "slippage",
        "pnl",
    ])?;
    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.direction).to_lowercase(),
            &t.entry_index.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.size.to_string(),
            &format!("{:.2}", t.commission),
            &format!("{:.2}", t.slippage),
            &format!("{:.2}", t.pnl),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([&i.to_string(), &format!("{:.2}", eq)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifacts ───────────────────────────────────────────────────────

/// Write `report.json` and `results.csv` into `output_dir`, creating it if
/// needed. Returns `output_dir`.
pub fn save_report(report: &OptimizationReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;
    std::fs::write(output_dir.join("report.json"), export_report_json(report)?)?;
    std::fs::write(output_dir.join("results.csv"), export_report_csv(report)?)?;
    Ok(output_dir.to_path_buf())
}

pub fn load_report(dir: &Path) -> Result<OptimizationReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_report_json(&json)
}

/// Write `backtest.json`, `trades.csv` and `equity.csv` into `output_dir`.
pub fn save_backtest(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    std::fs::write(output_dir.join("backtest.json"), export_backtest_json(result)?)?;
    std::fs::write(output_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;
    std::fs::write(
        output_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )?;
    Ok(output_dir.to_path_buf())
}
