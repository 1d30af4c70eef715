use ironbark_domain::repositories::artifacts::ArtifactReader;
use std::path::Path;

/// Renders a completed run's summary.json as a human-readable report.
pub fn report(run_dir: &Path, artifacts: &dyn ArtifactReader) -> Result<String, String> {
    let summary_path = run_dir.join("summary.json");
    if !artifacts.exists(&summary_path) {
        return Err(format!(
            "no summary.json under {} (is this a run directory?)",
            run_dir.display()
        ));
    }
    let value = artifacts.read_summary_json(&summary_path)?;
    let summary = value.get("summary").unwrap_or(&value);
    let meta = value.get("meta");

    let fmt = |key: &str| -> String {
        match summary.get(key) {
            Some(serde_json::Value::Number(n)) => match n.as_u64() {
                Some(int) => int.to_string(),
                None => format!("{:.4}", n.as_f64().unwrap_or(0.0)),
            },
            Some(serde_json::Value::Null) | None => "n/a".to_string(),
            Some(other) => other.to_string(),
        }
    };

    let mut lines = Vec::new();
    lines.push("=== backtest summary ===".to_string());
    if let Some(meta) = meta {
        if let Some(run_id) = meta.get("run_id").and_then(|v| v.as_str()) {
            lines.push(format!("run_id:           {run_id}"));
        }
        if let Some(strategy) = meta.get("strategy").and_then(|v| v.as_str()) {
            lines.push(format!("strategy:         {strategy}"));
        }
        if let Some(symbols) = meta.get("symbols").and_then(|v| v.as_array()) {
            let names: Vec<&str> = symbols.iter().filter_map(|s| s.as_str()).collect();
            lines.push(format!("symbols:          {}", names.join(", ")));
        }
    }
    lines.push(format!("initial capital:  {}", fmt("initial_capital")));
    lines.push(format!("final value:      {}", fmt("final_value")));
    lines.push(format!("total return:     {}", fmt("total_return")));
    lines.push(format!("sharpe:           {}", fmt("sharpe")));
    lines.push(format!("max drawdown:     {}", fmt("max_drawdown")));
    lines.push(format!("trades:           {}", fmt("total_trades")));
    lines.push(format!("win rate:         {}", fmt("win_rate")));
    lines.push(format!("profit factor:    {}", fmt("profit_factor")));

    Ok(lines.join("\n"))
}
