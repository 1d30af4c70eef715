use crate::backtesting;
use crate::config::Config;
use crate::validation::validate_config;
use ironbark_domain::repositories::market_data::{BarRepository, CachedBarRepository};
use ironbark_domain::services::analytics::PerformanceReport;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Sharpe,
    TotalReturn,
    ProfitFactor,
    WinRate,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParamGrid {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationEntry {
    pub run_id: String,
    pub params: BTreeMap<String, f64>,
    pub status: String,
    pub error: Option<String>,
    pub report: Option<PerformanceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub optimization_id: String,
    pub objective: Objective,
    /// Ranked best-first by the objective, ties broken by total return.
    pub entries: Vec<OptimizationEntry>,
    pub leaderboard_path: Option<PathBuf>,
}

/// Full cartesian product of the configured parameter lists, in
/// deterministic order (parameters and values in listed order, the first
/// parameter varying slowest).
pub fn expand_grid(params: &[ParamGrid]) -> Vec<BTreeMap<String, f64>> {
    let mut grid: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new()];
    for param in params {
        let mut next = Vec::with_capacity(grid.len() * param.values.len());
        for base in &grid {
            for value in &param.values {
                let mut combination = base.clone();
                combination.insert(param.name.clone(), *value);
                next.push(combination);
            }
        }
        grid = next;
    }
    grid
}

/// Grid-search over strategy parameters. Each combination runs an isolated
/// engine against a shared read-only bar cache; workers stop after their
/// current run when the cancel flag is raised.
pub fn run_optimization<R: BarRepository>(
    config: &Config,
    market_data: R,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<OptimizationOutcome, String> {
    let _span = info_span!(
        "run_optimization",
        run_id = %config.run.run_id,
        strategy = %config.strategy.name
    )
    .entered();

    validate_config(config)?;
    let optimizer = config
        .optimizer
        .as_ref()
        .ok_or_else(|| "config has no [optimizer] section".to_string())?;
    if optimizer.params.is_empty() {
        return Err("optimizer has no parameters to sweep".to_string());
    }
    for param in &optimizer.params {
        if param.values.is_empty() {
            return Err(format!("optimizer param '{}' has no values", param.name));
        }
    }

    let grid = expand_grid(&optimizer.params);
    if grid.len() > optimizer.max_combinations {
        return Err(format!(
            "parameter grid has {} combinations, exceeding max_combinations = {}",
            grid.len(),
            optimizer.max_combinations
        ));
    }
    tracing::info!(combinations = grid.len(), "expanding parameter grid");

    let cached = CachedBarRepository::new(market_data);
    let stage_start = Instant::now();

    let evaluate = |(index, params): (usize, &BTreeMap<String, f64>)| -> OptimizationEntry {
        let run_id = format!("{}_{:04}", config.run.run_id, index);
        if let Some(flag) = &cancel {
            if flag.load(Ordering::Relaxed) {
                return OptimizationEntry {
                    run_id,
                    params: params.clone(),
                    status: "cancelled".to_string(),
                    error: None,
                    report: None,
                };
            }
        }

        let mut strategy_config = config.strategy_config();
        for (name, value) in params {
            strategy_config.params.insert(name.clone(), *value);
        }

        match backtesting::execute(config, strategy_config, &cached, cancel.clone()) {
            Ok((_result, report)) => OptimizationEntry {
                run_id,
                params: params.clone(),
                status: "ok".to_string(),
                error: None,
                report: Some(report),
            },
            Err(err) => OptimizationEntry {
                run_id,
                params: params.clone(),
                status: if err.contains("cancelled") {
                    "cancelled".to_string()
                } else {
                    "error".to_string()
                },
                error: Some(err),
                report: None,
            },
        }
    };

    let mut entries: Vec<OptimizationEntry> = match optimizer.parallelism {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| format!("failed to build worker pool: {err}"))?;
            pool.install(|| grid.par_iter().enumerate().map(evaluate).collect())
        }
        None => grid.par_iter().enumerate().map(evaluate).collect(),
    };

    metrics::histogram!("ironbark.optimize.sweep_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    metrics::gauge!("ironbark.optimize.combinations").set(entries.len() as f64);

    rank_entries(&mut entries, optimizer.objective);

    let leaderboard_path =
        write_leaderboard(config, &entries).map_err(|err| format!("leaderboard: {err}"))?;

    Ok(OptimizationOutcome {
        optimization_id: config.run.run_id.clone(),
        objective: optimizer.objective,
        entries,
        leaderboard_path: Some(leaderboard_path),
    })
}

fn objective_value(report: &PerformanceReport, objective: Objective) -> f64 {
    let metric = match objective {
        Objective::Sharpe => report.sharpe,
        Objective::TotalReturn => Some(report.total_return),
        Objective::ProfitFactor => report.profit_factor,
        Objective::WinRate => report.win_rate,
    };
    metric.unwrap_or(f64::NEG_INFINITY)
}

fn rank_entries(entries: &mut [OptimizationEntry], objective: Objective) {
    entries.sort_by(|a, b| {
        let score = |entry: &OptimizationEntry| {
            entry
                .report
                .as_ref()
                .map(|r| (objective_value(r, objective), r.total_return))
                .unwrap_or((f64::NEG_INFINITY, f64::NEG_INFINITY))
        };
        let (a_obj, a_ret) = score(a);
        let (b_obj, b_ret) = score(b);
        b_obj
            .partial_cmp(&a_obj)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b_ret.partial_cmp(&a_ret).unwrap_or(std::cmp::Ordering::Equal))
    });
}

fn write_leaderboard(config: &Config, entries: &[OptimizationEntry]) -> Result<PathBuf, String> {
    let dir = Path::new(&config.paths.out_dir)
        .join("optimizations")
        .join(&config.run.run_id);
    std::fs::create_dir_all(&dir)
        .map_err(|err| format!("failed to create {}: {err}", dir.display()))?;

    let path = dir.join("leaderboard.csv");
    let mut writer = csv::Writer::from_path(&path)
        .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
    writer
        .write_record([
            "rank",
            "run_id",
            "status",
            "params",
            "sharpe",
            "total_return",
            "max_drawdown",
            "win_rate",
            "profit_factor",
            "trades",
        ])
        .map_err(|err| format!("failed to write header: {err}"))?;

    for (rank, entry) in entries.iter().enumerate() {
        let params = entry
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        let fmt_opt = |v: Option<f64>| v.map(|v| format!("{v}")).unwrap_or_default();
        let record = match &entry.report {
            Some(report) => vec![
                (rank + 1).to_string(),
                entry.run_id.clone(),
                entry.status.clone(),
                params,
                fmt_opt(report.sharpe),
                format!("{}", report.total_return),
                format!("{}", report.max_drawdown),
                fmt_opt(report.win_rate),
                fmt_opt(report.profit_factor),
                report.total_trades.to_string(),
            ],
            None => vec![
                (rank + 1).to_string(),
                entry.run_id.clone(),
                entry.status.clone(),
                params,
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };
        writer
            .write_record(record)
            .map_err(|err| format!("failed to write row: {err}"))?;
    }
    writer
        .flush()
        .map_err(|err| format!("failed to flush {}: {err}", path.display()))?;
    Ok(path)
}
