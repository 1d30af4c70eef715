use crate::config::Config;
use crate::shared::{config_snapshot_json, resolve_analytics_config};
use crate::validation::validate_config;
use ironbark_domain::entities::strategy_config::StrategyConfig;
use ironbark_domain::repositories::artifacts::ArtifactWriter;
use ironbark_domain::repositories::market_data::BarRepository;
use ironbark_domain::services::analytics::{analyze, PerformanceReport};
use ironbark_domain::services::engine::{BacktestEngine, BacktestResult};
use ironbark_domain::services::strategy::build_strategy;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug)]
pub struct BacktestOutput {
    pub run_dir: PathBuf,
    pub result: BacktestResult,
    pub report: PerformanceReport,
}

/// Runs one backtest from config to artifacts: validate, simulate, analyze,
/// write trades/equity/rejections/summary under `<out_dir>/<run_id>/`.
pub fn run_backtest(
    config: &Config,
    out: Option<PathBuf>,
    market_data: &dyn BarRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<BacktestOutput, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        strategy = %config.strategy.name
    )
    .entered();

    validate_config(config)?;
    let (result, report) = execute(config, config.strategy_config(), market_data, None)?;

    if !result.rejections.is_empty() {
        tracing::info!(
            rejections = result.rejections.len(),
            "some signals were rejected; see rejections.jsonl"
        );
    }

    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;
    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), &result.trades)?;
    artifacts.write_equity_csv(run_dir.join("equity.csv").as_path(), &result.equity_curve)?;
    artifacts.write_rejections_jsonl(
        run_dir.join("rejections.jsonl").as_path(),
        &result.rejections,
    )?;

    let meta = json!({
        "run_id": config.run.run_id,
        "strategy": result.strategy,
        "symbols": result.symbols,
        "start": result.start,
        "end": result.end,
        "steps": result.steps,
        "rejections": result.rejections.len(),
        "total_commission": result.total_commission,
        "total_slippage": result.total_slippage,
        "config_snapshot": config_snapshot_json(config),
    });
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &report,
        Some(&meta),
    )?;

    Ok(BacktestOutput {
        run_dir,
        result,
        report,
    })
}

/// Simulation without artifact writing, shared with the optimizer. The
/// `strategy_config` may differ from the one in `config` when a parameter
/// combination is being evaluated.
pub fn execute(
    config: &Config,
    strategy_config: StrategyConfig,
    market_data: &dyn BarRepository,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<(BacktestResult, PerformanceReport), String> {
    let (start, end) = config.date_range()?;
    let strategy = build_strategy(&strategy_config)
        .map_err(|err| format!("failed to build strategy: {err}"))?;

    let mut engine = BacktestEngine::new(
        strategy,
        strategy_config,
        config.execution_config(),
        config.run.initial_capital,
    );
    if let Some(flag) = cancel {
        engine = engine.with_cancel_flag(flag);
    }

    let stage_start = Instant::now();
    engine
        .initialize(market_data, &config.run.symbols, start, end)
        .map_err(|err| format!("backtest initialization failed: {err}"))?;
    metrics::histogram!("ironbark.backtest.initialize_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let stage_start = Instant::now();
    let result = engine
        .run()
        .map_err(|err| format!("backtest run failed: {err}"))?;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("ironbark.backtest.engine_ms").record(engine_ms);
    metrics::gauge!("ironbark.backtest.steps").set(result.steps as f64);
    metrics::gauge!("ironbark.backtest.trades").set(result.trades.len() as f64);

    let report = analyze(
        &result.equity_curve,
        &result.trades,
        result.initial_capital,
        &resolve_analytics_config(config),
    );
    Ok((result, report))
}
