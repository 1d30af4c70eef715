use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceFrequency {
    Daily,
    Intraday,
}

/// Immutable parameter bundle for one backtest run. Created once per
/// invocation and never mutated while the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Registry key of the strategy variant, e.g. "ma_crossover".
    pub name: String,
    pub params: BTreeMap<String, f64>,
    /// Largest single-position notional as a fraction of portfolio value.
    pub max_position_size: f64,
    pub max_positions: usize,
    /// Fraction of portfolio value at risk per trade. Zero is legal and
    /// rejects every signal.
    pub risk_per_trade: f64,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    /// Bars of history the strategy needs before it can emit signals.
    pub lookback_period: usize,
    pub rebalance: RebalanceFrequency,
}

impl StrategyConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: BTreeMap::new(),
            max_position_size: 0.25,
            max_positions: 10,
            risk_per_trade: 1.0,
            stop_loss_pct: None,
            take_profit_pct: None,
            lookback_period: 50,
            rebalance: RebalanceFrequency::Daily,
        }
    }

    pub fn with_param(mut self, key: &str, value: f64) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn param(&self, key: &str, default: f64) -> f64 {
        self.params.get(key).copied().unwrap_or(default)
    }

    /// Field-by-field issue list; empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push("strategy name cannot be empty".to_string());
        }
        if !(self.max_position_size > 0.0 && self.max_position_size <= 1.0) {
            issues.push("max_position_size must be in (0, 1]".to_string());
        }
        if self.max_positions == 0 {
            issues.push("max_positions must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.risk_per_trade) || !self.risk_per_trade.is_finite() {
            issues.push("risk_per_trade must be in [0, 1]".to_string());
        }
        if let Some(stop) = self.stop_loss_pct {
            if !(stop > 0.0 && stop < 1.0) {
                issues.push("stop_loss_pct must be in (0, 1)".to_string());
            }
        }
        if let Some(take) = self.take_profit_pct {
            if take <= 0.0 || !take.is_finite() {
                issues.push("take_profit_pct must be positive".to_string());
            }
        }
        if self.lookback_period == 0 {
            issues.push("lookback_period must be positive".to_string());
        }
        for (key, value) in &self.params {
            if !value.is_finite() {
                issues.push(format!("parameter '{}' is not finite", key));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::StrategyConfig;

    #[test]
    fn default_config_validates() {
        assert!(StrategyConfig::new("ma_crossover").validate().is_empty());
    }

    #[test]
    fn zero_risk_per_trade_is_legal() {
        let mut config = StrategyConfig::new("ma_crossover");
        config.risk_per_trade = 0.0;
        assert!(config.validate().is_empty());
    }

    #[test]
    fn out_of_range_fields_are_reported() {
        let mut config = StrategyConfig::new("");
        config.max_position_size = 1.5;
        config.max_positions = 0;
        config.risk_per_trade = -0.1;
        config.stop_loss_pct = Some(1.0);
        config.lookback_period = 0;

        let issues = config.validate();
        assert_eq!(issues.len(), 6);
    }
}
