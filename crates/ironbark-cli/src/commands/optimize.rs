use ironbark_application::config::load_config;
use ironbark_application::optimization::run_optimization;
use std::path::PathBuf;

pub(super) fn run(config_path: PathBuf) -> Result<(), String> {
    let config = load_config(&config_path)?;
    super::common::print_config_summary("optimize", &config);

    let overall_start = std::time::Instant::now();
    let market_data = crate::infra::build_bar_repository(&config)?;

    let outcome = run_optimization(&config, market_data, None)?;

    println!(
        "optimization {}: {} combinations ({} ok)",
        outcome.optimization_id,
        outcome.entries.len(),
        outcome
            .entries
            .iter()
            .filter(|e| e.status == "ok")
            .count()
    );
    for entry in outcome.entries.iter().take(5) {
        let params = entry
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        match &entry.report {
            Some(report) => println!(
                "  {} [{params}] sharpe={} return={:.4}",
                entry.run_id,
                report
                    .sharpe
                    .map(|s| format!("{s:.4}"))
                    .unwrap_or_else(|| "n/a".to_string()),
                report.total_return
            ),
            None => println!("  {} [{params}] {}", entry.run_id, entry.status),
        }
    }
    if let Some(path) = &outcome.leaderboard_path {
        println!("leaderboard: {}", path.display());
    }
    println!("total_ms={}", overall_start.elapsed().as_millis());
    Ok(())
}
