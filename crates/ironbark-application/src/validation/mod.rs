use crate::config::{Config, DataSource};
use ironbark_domain::repositories::market_data::BarRepository;
use ironbark_domain::services::strategy::{build_strategy, REGISTERED_STRATEGIES};
use ironbark_domain::value_objects::bar::Bar;
use serde::Serialize;
use tracing::info_span;

/// Fail-fast configuration checks, run before any simulation step.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut issues = Vec::new();

    if config.run.run_id.trim().is_empty() {
        issues.push("run.run_id cannot be empty".to_string());
    }
    if config.run.symbols.is_empty() {
        issues.push("run.symbols cannot be empty".to_string());
    }
    if config.run.symbols.iter().any(|s| s.trim().is_empty()) {
        issues.push("run.symbols contains an empty symbol".to_string());
    }
    if !(config.run.initial_capital > 0.0) || !config.run.initial_capital.is_finite() {
        issues.push("run.initial_capital must be positive".to_string());
    }
    match config.date_range() {
        Ok((start, end)) if start >= end => {
            issues.push("run.start must be before run.end".to_string())
        }
        Ok(_) => {}
        Err(err) => issues.push(err),
    }

    if config.costs.slippage_bps < 0.0 {
        issues.push("costs.slippage_bps cannot be negative".to_string());
    }
    if config.costs.commission_value < 0.0 {
        issues.push("costs.commission_value cannot be negative".to_string());
    }

    match config.data.source {
        DataSource::Csv if config.data.csv_dir.is_none() => {
            issues.push("data.source = csv requires data.csv_dir".to_string())
        }
        DataSource::Postgres if config.data.database_url.is_none() => {
            issues.push("data.source = postgres requires data.database_url".to_string())
        }
        _ => {}
    }

    let strategy_config = config.strategy_config();
    issues.extend(strategy_config.validate());
    if let Err(err) = build_strategy(&strategy_config) {
        issues.push(format!(
            "{err} (registered: {})",
            REGISTERED_STRATEGIES.join(", ")
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(format!("invalid config: {}", issues.join("; ")))
    }
}

/// Per-symbol bar diagnostics over the configured range.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub out_of_order: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

pub fn data_quality_from_bars(bars: &[Bar]) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        first_timestamp: bars.first().map(|b| b.timestamp),
        last_timestamp: bars.last().map(|b| b.timestamp),
        ..DataQualityReport::default()
    };

    let mut prev: Option<i64> = None;
    for bar in bars {
        if let Some(prev_ts) = prev {
            if bar.timestamp < prev_ts {
                report.out_of_order += 1;
            } else if bar.timestamp == prev_ts {
                report.duplicates += 1;
            }
        }
        prev = Some(bar.timestamp);
        if !bar.is_well_formed() {
            report.malformed += 1;
        }
    }
    report
}

/// Validates the config and, with data checks enabled, probes every
/// symbol's bars. `strict` turns any data-quality finding into an error.
pub fn validate(
    config: &Config,
    strict: bool,
    market_data: &dyn BarRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!("validate", run_id = %config.run.run_id, strict = strict).entered();

    validate_config(config)?;
    let (start, end) = config.date_range()?;

    let mut symbols = serde_json::Map::new();
    for symbol in &config.run.symbols {
        let bars = market_data
            .get_bars(symbol, start, end)
            .map_err(|err| format!("data validation failed: {err}"))?;
        let report = data_quality_from_bars(&bars);

        if strict && (report.out_of_order > 0 || report.duplicates > 0 || report.malformed > 0) {
            return Err(format!(
                "strict validation failed for {symbol}: {} out-of-order, {} duplicate, {} malformed bars",
                report.out_of_order, report.duplicates, report.malformed
            ));
        }

        metrics::gauge!("ironbark.validate.rows", "symbol" => symbol.clone())
            .set(report.rows as f64);
        symbols.insert(
            symbol.clone(),
            serde_json::to_value(&report).unwrap_or(serde_json::Value::Null),
        );
    }

    Ok(serde_json::json!({
        "run_id": config.run.run_id,
        "strict": strict,
        "symbols": symbols,
    }))
}

#[cfg(test)]
mod tests {
    use super::{data_quality_from_bars, validate_config};
    use crate::config::Config;
    use ironbark_domain::value_objects::bar::Bar;

    fn base_config() -> Config {
        toml::from_str(
            r#"
[run]
run_id = "check"
symbols = ["BHP"]
start = "2024-01-01"
end = "2024-06-30"
initial_capital = 100000.0

[data]
source = "csv"
csv_dir = "data/bars"

[costs]
slippage_bps = 0.0
commission_mode = "flat"
commission_value = 0.0

[strategy]
name = "buy_and_hold"

[paths]
out_dir = "runs/"
"#,
        )
        .unwrap()
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn empty_symbols_fail_fast() {
        let mut config = base_config();
        config.run.symbols.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("run.symbols"));
    }

    #[test]
    fn reversed_dates_fail_fast() {
        let mut config = base_config();
        config.run.start = "2024-06-30".to_string();
        config.run.end = "2024-01-01".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn unknown_strategy_lists_the_registry() {
        let mut config = base_config();
        config.strategy.name = "quantum_hedge".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.contains("unknown strategy"));
        assert!(err.contains("ma_crossover"));
    }

    #[test]
    fn data_quality_counts_defects() {
        let bar = |ts: i64, close: f64| Bar {
            symbol: "BHP".to_string(),
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        };
        let mut bad = bar(3, 10.0);
        bad.low = 20.0;

        let report = data_quality_from_bars(&[bar(1, 10.0), bar(1, 10.0), bar(2, 10.0), bad]);
        assert_eq!(report.rows, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.out_of_order, 0);
    }
}
