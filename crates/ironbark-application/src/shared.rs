use crate::config::Config;
use chrono::{DateTime, NaiveDate};
use ironbark_domain::entities::strategy_config::RebalanceFrequency;
use ironbark_domain::services::analytics::AnalyticsConfig;

/// Accepts epoch seconds, RFC3339 datetimes or plain `YYYY-MM-DD` dates.
pub fn parse_timestamp(raw: &str) -> Result<i64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("timestamp cannot be empty".to_string());
    }
    if let Ok(secs) = trimmed.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date: {trimmed}"))?;
        return Ok(dt.and_utc().timestamp());
    }
    Err(format!(
        "invalid timestamp (expected epoch seconds, RFC3339 or YYYY-MM-DD): {trimmed}"
    ))
}

pub fn resolve_analytics_config(config: &Config) -> AnalyticsConfig {
    let default_periods = match config.strategy.rebalance {
        RebalanceFrequency::Daily => 252.0,
        // Hourly bars over a trading year unless overridden.
        RebalanceFrequency::Intraday => 252.0 * 6.5,
    };
    AnalyticsConfig {
        risk_free_rate: config.analytics.risk_free_rate,
        periods_per_year: config
            .analytics
            .periods_per_year
            .unwrap_or(default_periods),
    }
}

pub fn config_snapshot_json(config: &Config) -> serde_json::Value {
    serde_json::to_value(config).unwrap_or(serde_json::Value::Null)
}
