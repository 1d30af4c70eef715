use crate::optimization::{Objective, ParamGrid};
use crate::shared::parse_timestamp;
use ironbark_domain::entities::strategy_config::{RebalanceFrequency, StrategyConfig};
use ironbark_domain::services::engine::execution::{CommissionModel, ExecutionConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub data: DataConfig,
    pub costs: CostsConfig,
    pub strategy: StrategySection,
    #[serde(default)]
    pub analytics: AnalyticsSection,
    pub optimizer: Option<OptimizerSection>,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbols: Vec<String>,
    /// Epoch seconds, RFC3339 or YYYY-MM-DD.
    pub start: String,
    pub end: String,
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Csv,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub source: DataSource,
    pub csv_dir: Option<String>,
    pub database_url: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

fn default_table() -> String {
    "daily_prices".to_string()
}

fn default_pool_size() -> u32 {
    4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionMode {
    Flat,
    Pct,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostsConfig {
    #[serde(default)]
    pub slippage_bps: f64,
    pub commission_mode: CommissionMode,
    /// Dollars per fill for `flat`, fraction of notional for `pct`.
    pub commission_value: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySection {
    pub name: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: f64,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    #[serde(default = "default_lookback")]
    pub lookback_period: usize,
    #[serde(default = "default_rebalance")]
    pub rebalance: RebalanceFrequency,
}

fn default_max_position_size() -> f64 {
    0.25
}

fn default_max_positions() -> usize {
    10
}

fn default_risk_per_trade() -> f64 {
    1.0
}

fn default_lookback() -> usize {
    50
}

fn default_rebalance() -> RebalanceFrequency {
    RebalanceFrequency::Daily
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsSection {
    #[serde(default)]
    pub risk_free_rate: f64,
    pub periods_per_year: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OptimizerSection {
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default = "default_max_combinations")]
    pub max_combinations: usize,
    pub parallelism: Option<usize>,
    #[serde(default)]
    pub params: Vec<ParamGrid>,
}

fn default_objective() -> Objective {
    Objective::Sharpe
}

fn default_max_combinations() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub out_dir: String,
}

impl Config {
    pub fn strategy_config(&self) -> StrategyConfig {
        StrategyConfig {
            name: self.strategy.name.clone(),
            params: self.strategy.params.clone(),
            max_position_size: self.strategy.max_position_size,
            max_positions: self.strategy.max_positions,
            risk_per_trade: self.strategy.risk_per_trade,
            stop_loss_pct: self.strategy.stop_loss_pct,
            take_profit_pct: self.strategy.take_profit_pct,
            lookback_period: self.strategy.lookback_period,
            rebalance: self.strategy.rebalance,
        }
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            slippage_bps: self.costs.slippage_bps,
            commission: match self.costs.commission_mode {
                CommissionMode::Flat => CommissionModel::Flat(self.costs.commission_value),
                CommissionMode::Pct => CommissionModel::Rate(self.costs.commission_value),
            },
        }
    }

    pub fn date_range(&self) -> Result<(i64, i64), String> {
        let start = parse_timestamp(&self.run.start)
            .map_err(|err| format!("invalid run.start: {err}"))?;
        let end =
            parse_timestamp(&self.run.end).map_err(|err| format!("invalid run.end: {err}"))?;
        Ok((start, end))
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::{load_config, CommissionMode, Config, DataSource};
    use ironbark_domain::services::engine::execution::CommissionModel;
    use std::path::Path;

    fn parse_config(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("config should parse")
    }

    const MINIMAL: &str = r#"
[run]
run_id = "asx_daily_2024"
symbols = ["BHP", "CSL"]
start = "2024-01-01"
end = "2024-06-30"
initial_capital = 100000.0

[data]
source = "csv"
csv_dir = "data/bars"

[costs]
slippage_bps = 5.0
commission_mode = "flat"
commission_value = 6.0

[strategy]
name = "ma_crossover"

[strategy.params]
short_window = 20
long_window = 50

[paths]
out_dir = "runs/"
"#;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(MINIMAL);
        assert_eq!(config.run.symbols, vec!["BHP", "CSL"]);
        assert_eq!(config.data.source, DataSource::Csv);
        assert_eq!(config.data.table, "daily_prices");
        assert_eq!(config.costs.commission_mode, CommissionMode::Flat);
        assert_eq!(config.strategy.max_positions, 10);
        assert!(config.optimizer.is_none());

        let strategy = config.strategy_config();
        assert_eq!(strategy.param("short_window", 0.0), 20.0);

        let execution = config.execution_config();
        assert_eq!(execution.commission, CommissionModel::Flat(6.0));

        let (start, end) = config.date_range().unwrap();
        assert!(start < end);
    }

    #[test]
    fn parse_optimizer_section() {
        let toml_str = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[optimizer]
objective = "sharpe"
max_combinations = 100

[[optimizer.params]]
name = "short_window"
values = [10, 20, 30]

[[optimizer.params]]
name = "long_window"
values = [50, 100, 200]
"#
        );
        let config = parse_config(&toml_str);
        let optimizer = config.optimizer.unwrap();
        assert_eq!(optimizer.params.len(), 2);
        assert_eq!(optimizer.params[0].values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml_str = format!("{}\nunknown_section = 1\n", MINIMAL);
        assert!(toml::from_str::<Config>(&toml_str).is_err());
    }

    #[test]
    fn load_config_missing_file_returns_error() {
        let path = Path::new("/tmp/ironbark-missing-config.toml");
        let err = load_config(path).expect_err("expected load to fail");
        assert!(err.contains("failed to read config"));
    }
}
