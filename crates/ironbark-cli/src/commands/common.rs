use ironbark_application::config::{Config, DataSource};

pub(super) fn print_config_summary(command: &str, config: &Config) {
    println!(
        "ironbark: {} (run_id={}, strategy={}, symbols={}, initial_capital={})",
        command,
        config.run.run_id,
        config.strategy.name,
        config.run.symbols.join(","),
        config.run.initial_capital
    );
    let source = match config.data.source {
        DataSource::Csv => format!("csv:{}", config.data.csv_dir.as_deref().unwrap_or("?")),
        DataSource::Postgres => format!("postgres:{}", config.data.table),
    };
    println!(
        "data: {} range={}..{} out_dir={}",
        source, config.run.start, config.run.end, config.paths.out_dir
    );
    println!(
        "costs: slippage_bps={} commission={:?}/{}",
        config.costs.slippage_bps, config.costs.commission_mode, config.costs.commission_value
    );
}
