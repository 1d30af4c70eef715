use ironbark_application::config::load_config;
use std::path::PathBuf;

pub(super) fn run(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path)?;
    super::common::print_config_summary("backtest", &config);

    let overall_start = std::time::Instant::now();
    let market_data = crate::infra::build_bar_repository(&config)?;
    let artifacts = crate::infra::build_artifact_writer();

    let output = ironbark_application::backtesting::run_backtest(
        &config,
        out,
        market_data.as_ref(),
        artifacts.as_ref(),
    )?;

    println!("run output: {}", output.run_dir.display());
    println!(
        "final_value={:.2} total_return={:.4} trades={} rejections={} total_ms={}",
        output.report.final_value,
        output.report.total_return,
        output.report.total_trades,
        output.result.rejections.len(),
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
