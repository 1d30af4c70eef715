mod buy_and_hold;
mod crossover;
mod mean_reversion;

pub use buy_and_hold::BuyAndHold;
pub use crossover::MovingAverageCrossover;
pub use mean_reversion::MeanReversionRsi;

use crate::entities::portfolio::Portfolio;
use crate::entities::strategy_config::StrategyConfig;
use crate::errors::{ConfigError, StrategyError};
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::Signal;
use std::collections::BTreeMap;

/// Read-only view of each symbol's bars up to and including the current
/// engine timestamp.
#[derive(Debug, Default)]
pub struct DataWindow<'a> {
    series: BTreeMap<&'a str, &'a [Bar]>,
}

impl<'a> DataWindow<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &'a str, bars: &'a [Bar]) {
        self.series.insert(symbol, bars);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.series.keys().copied()
    }

    pub fn bars(&self, symbol: &str) -> Option<&'a [Bar]> {
        self.series.get(symbol).copied()
    }

    pub fn latest(&self, symbol: &str) -> Option<&'a Bar> {
        self.bars(symbol).and_then(<[Bar]>::last)
    }

    /// True when `symbol` has a fresh bar exactly at `timestamp`, i.e. this
    /// step advanced that symbol's series.
    pub fn has_bar_at(&self, symbol: &str, timestamp: i64) -> bool {
        self.latest(symbol)
            .map(|bar| bar.timestamp == timestamp)
            .unwrap_or(false)
    }
}

/// The pluggable strategy contract. Implementations must not mutate the
/// portfolio directly; every position change flows through returned signals.
pub trait Strategy {
    fn name(&self) -> &str;

    /// One-time setup before the first `generate_signals` call.
    fn initialize(&mut self, symbols: &[String], start: i64, end: i64)
        -> Result<(), StrategyError>;

    /// Called once per time step. The order of the returned signals is the
    /// execution order for that step.
    fn generate_signals(
        &mut self,
        window: &DataWindow,
        timestamp: i64,
        portfolio: &Portfolio,
    ) -> Result<Vec<Signal>, StrategyError>;

    /// Called after signal execution each step, for state the strategy
    /// tracks independently of emitted signals.
    fn update_state(
        &mut self,
        _window: &DataWindow,
        _timestamp: i64,
        _portfolio: &Portfolio,
    ) -> Result<(), StrategyError> {
        Ok(())
    }
}

/// Compiled strategy variants. New strategies register here and in
/// `build_strategy`; there is deliberately no runtime code loading.
#[derive(Debug)]
pub enum StrategyKind {
    MovingAverageCrossover(MovingAverageCrossover),
    MeanReversionRsi(MeanReversionRsi),
    BuyAndHold(BuyAndHold),
}

impl Strategy for StrategyKind {
    fn name(&self) -> &str {
        match self {
            StrategyKind::MovingAverageCrossover(s) => s.name(),
            StrategyKind::MeanReversionRsi(s) => s.name(),
            StrategyKind::BuyAndHold(s) => s.name(),
        }
    }

    fn initialize(
        &mut self,
        symbols: &[String],
        start: i64,
        end: i64,
    ) -> Result<(), StrategyError> {
        match self {
            StrategyKind::MovingAverageCrossover(s) => s.initialize(symbols, start, end),
            StrategyKind::MeanReversionRsi(s) => s.initialize(symbols, start, end),
            StrategyKind::BuyAndHold(s) => s.initialize(symbols, start, end),
        }
    }

    fn generate_signals(
        &mut self,
        window: &DataWindow,
        timestamp: i64,
        portfolio: &Portfolio,
    ) -> Result<Vec<Signal>, StrategyError> {
        match self {
            StrategyKind::MovingAverageCrossover(s) => {
                s.generate_signals(window, timestamp, portfolio)
            }
            StrategyKind::MeanReversionRsi(s) => s.generate_signals(window, timestamp, portfolio),
            StrategyKind::BuyAndHold(s) => s.generate_signals(window, timestamp, portfolio),
        }
    }

    fn update_state(
        &mut self,
        window: &DataWindow,
        timestamp: i64,
        portfolio: &Portfolio,
    ) -> Result<(), StrategyError> {
        match self {
            StrategyKind::MovingAverageCrossover(s) => s.update_state(window, timestamp, portfolio),
            StrategyKind::MeanReversionRsi(s) => s.update_state(window, timestamp, portfolio),
            StrategyKind::BuyAndHold(s) => s.update_state(window, timestamp, portfolio),
        }
    }
}

pub const REGISTERED_STRATEGIES: &[&str] = &["buy_and_hold", "ma_crossover", "rsi_reversion"];

/// Constructs a built-in strategy from its registry key and parameters.
pub fn build_strategy(config: &StrategyConfig) -> Result<StrategyKind, ConfigError> {
    match config.name.as_str() {
        "ma_crossover" => Ok(StrategyKind::MovingAverageCrossover(
            MovingAverageCrossover::from_config(config)?,
        )),
        "rsi_reversion" => Ok(StrategyKind::MeanReversionRsi(MeanReversionRsi::from_config(
            config,
        )?)),
        "buy_and_hold" => Ok(StrategyKind::BuyAndHold(BuyAndHold::from_config(config)?)),
        other => Err(ConfigError::UnknownStrategy(other.to_string())),
    }
}
