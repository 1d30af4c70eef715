pub mod execution;

use crate::entities::portfolio::Portfolio;
use crate::entities::strategy_config::StrategyConfig;
use crate::errors::{ConfigError, DataError, EngineError, PortfolioError};
use crate::repositories::market_data::BarRepository;
use crate::services::strategy::{DataWindow, Strategy};
use crate::value_objects::bar::Bar;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::side::Side;
use crate::value_objects::signal::{OrderType, Signal, SignalType};
use crate::value_objects::trade::TradeRecord;
use execution::{ExecutionConfig, Flow};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    Running,
    Completed,
    Failed,
}

/// A signal the engine declined to fill. Expected strategy behavior, not a
/// fault: the run continues and the rejection is reported with the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRejection {
    pub timestamp: i64,
    pub symbol: String,
    pub signal_type: SignalType,
    pub quantity: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub symbols: Vec<String>,
    pub start: i64,
    pub end: i64,
    pub initial_capital: f64,
    pub final_value: f64,
    pub steps: usize,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub rejections: Vec<SignalRejection>,
    pub total_commission: f64,
    pub total_slippage: f64,
}

/// Deterministic bar-replay engine. One timestamp is fully processed
/// (signals, fills, mark-to-market, state update) before the next begins;
/// all data is pre-fetched at initialization so no step blocks on I/O.
pub struct BacktestEngine<S: Strategy> {
    strategy: S,
    config: StrategyConfig,
    execution: ExecutionConfig,
    initial_capital: f64,
    state: EngineState,
    portfolio: Portfolio,
    series: BTreeMap<String, Vec<Bar>>,
    timeline: Vec<i64>,
    symbols: Vec<String>,
    start: i64,
    end: i64,
    rejections: Vec<SignalRejection>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<S: Strategy> BacktestEngine<S> {
    pub fn new(
        strategy: S,
        config: StrategyConfig,
        execution: ExecutionConfig,
        initial_capital: f64,
    ) -> Self {
        Self {
            strategy,
            config,
            execution,
            initial_capital,
            state: EngineState::Uninitialized,
            portfolio: Portfolio::new(initial_capital),
            series: BTreeMap::new(),
            timeline: Vec::new(),
            symbols: Vec::new(),
            start: 0,
            end: 0,
            rejections: Vec::new(),
            cancel: None,
        }
    }

    /// Installs a shared cancellation flag, checked once per timestamp so an
    /// abort never interrupts a step mid-way.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Validates the configuration, initializes the strategy and pre-fetches
    /// bars for every symbol. Any data gap is fatal here: a run over partial
    /// symbol coverage would produce misleading results.
    pub fn initialize(
        &mut self,
        repository: &dyn BarRepository,
        symbols: &[String],
        start: i64,
        end: i64,
    ) -> Result<(), EngineError> {
        if symbols.is_empty() {
            self.state = EngineState::Failed;
            return Err(ConfigError::EmptySymbols.into());
        }
        if start >= end {
            self.state = EngineState::Failed;
            return Err(ConfigError::InvalidDateRange { start, end }.into());
        }
        let issues = self.config.validate();
        if !issues.is_empty() {
            self.state = EngineState::Failed;
            return Err(ConfigError::Invalid(issues.join("; ")).into());
        }

        self.strategy
            .initialize(symbols, start, end)
            .map_err(|source| {
                self.state = EngineState::Failed;
                EngineError::Strategy {
                    strategy: self.config.name.clone(),
                    timestamp: start,
                    source,
                }
            })?;

        let mut timestamps = BTreeSet::new();
        self.series.clear();
        for symbol in symbols {
            let bars = repository.get_bars(symbol, start, end).map_err(|err| {
                self.state = EngineState::Failed;
                EngineError::Data(err)
            })?;
            if bars.is_empty() {
                self.state = EngineState::Failed;
                return Err(EngineError::Data(DataError::NotFound {
                    symbol: symbol.clone(),
                    start,
                    end,
                }));
            }
            for bar in &bars {
                timestamps.insert(bar.timestamp);
            }
            self.series.insert(symbol.clone(), bars);
        }

        self.timeline = timestamps.into_iter().collect();
        self.symbols = symbols.to_vec();
        self.start = start;
        self.end = end;
        self.portfolio = Portfolio::new(self.initial_capital);
        self.rejections.clear();
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Replays the union of all symbols' timestamps in ascending order. The
    /// single global time axis lets signals for one symbol be conditioned on
    /// another's concurrent state.
    pub fn run(&mut self) -> Result<BacktestResult, EngineError> {
        if self.state != EngineState::Initialized {
            return Err(EngineError::NotInitialized);
        }
        self.state = EngineState::Running;

        let mut cursors: BTreeMap<String, usize> = self
            .symbols
            .iter()
            .map(|symbol| (symbol.clone(), 0usize))
            .collect();
        let mut latest_prices: BTreeMap<String, f64> = BTreeMap::new();

        let timeline = self.timeline.clone();
        for &timestamp in &timeline {
            if let Some(flag) = &self.cancel {
                if flag.load(Ordering::Relaxed) {
                    self.state = EngineState::Failed;
                    return Err(EngineError::Cancelled { timestamp });
                }
            }

            for (symbol, cursor) in cursors.iter_mut() {
                let bars = &self.series[symbol];
                while *cursor < bars.len() && bars[*cursor].timestamp <= timestamp {
                    latest_prices.insert(symbol.clone(), bars[*cursor].close);
                    *cursor += 1;
                }
            }

            self.apply_protective_exits(&latest_prices, timestamp);

            let window = build_window(&self.series, &cursors);
            let signals = self
                .strategy
                .generate_signals(&window, timestamp, &self.portfolio)
                .map_err(|source| {
                    self.state = EngineState::Failed;
                    EngineError::Strategy {
                        strategy: self.config.name.clone(),
                        timestamp,
                        source,
                    }
                })?;
            drop(window);

            for signal in signals {
                self.execute_signal(signal, timestamp);
            }

            self.portfolio.mark_to_market(&latest_prices, timestamp);

            let window = build_window(&self.series, &cursors);
            self.strategy
                .update_state(&window, timestamp, &self.portfolio)
                .map_err(|source| {
                    self.state = EngineState::Failed;
                    EngineError::Strategy {
                        strategy: self.config.name.clone(),
                        timestamp,
                        source,
                    }
                })?;
        }

        self.state = EngineState::Completed;
        Ok(BacktestResult {
            strategy: self.config.name.clone(),
            symbols: self.symbols.clone(),
            start: self.start,
            end: self.end,
            initial_capital: self.initial_capital,
            final_value: self.portfolio.total_value(),
            steps: self.timeline.len(),
            equity_curve: self.portfolio.equity_curve().to_vec(),
            trades: self.portfolio.trades().to_vec(),
            rejections: std::mem::take(&mut self.rejections),
            total_commission: self.portfolio.total_commission(),
            total_slippage: self.portfolio.total_slippage(),
        })
    }

    /// Stop-loss / take-profit closes, applied at the step's mark price
    /// before the strategy sees the window.
    fn apply_protective_exits(&mut self, prices: &BTreeMap<String, f64>, timestamp: i64) {
        if self.config.stop_loss_pct.is_none() && self.config.take_profit_pct.is_none() {
            return;
        }

        let mut exits: Vec<(String, u64, f64, Side)> = Vec::new();
        for (symbol, position) in self.portfolio.positions() {
            let Some(price) = prices.get(symbol) else {
                continue;
            };
            let entry = position.entry_price;
            let moved = (price - entry) / entry * position.side.sign();
            let stop_hit = self
                .config
                .stop_loss_pct
                .map(|stop| moved <= -stop)
                .unwrap_or(false);
            let take_hit = self
                .config
                .take_profit_pct
                .map(|take| moved >= take)
                .unwrap_or(false);
            if stop_hit || take_hit {
                exits.push((symbol.clone(), position.quantity, *price, position.side));
            }
        }

        for (symbol, quantity, price, side) in exits {
            let flow = match side {
                Side::Long => Flow::Sell,
                Side::Short => Flow::Buy,
            };
            let fill = self.execution.fill_price(price, flow);
            let commission = self.execution.commission(fill * quantity as f64);
            let slippage = self.execution.slippage_cost(price, quantity);
            // Cannot fail: quantity and symbol come from the open position.
            let _ = self
                .portfolio
                .close_position(&symbol, quantity, fill, commission, slippage, timestamp);
        }
    }

    fn execute_signal(&mut self, signal: Signal, timestamp: i64) {
        if !signal.price.is_finite()
            || signal.price <= 0.0
            || signal.quantity == 0
            || !(0.0..=1.0).contains(&signal.confidence)
        {
            self.reject(&signal, timestamp, "invalid_signal");
            return;
        }
        if !self.series.contains_key(&signal.symbol) {
            self.reject(&signal, timestamp, "unknown_symbol");
            return;
        }
        if signal.order_type != OrderType::Market {
            self.reject(&signal, timestamp, "unsupported_order_type");
            return;
        }

        match signal.signal_type {
            SignalType::Buy | SignalType::Sell => self.execute_open(signal, timestamp),
            SignalType::Close => self.execute_close(signal, timestamp),
        }
    }

    fn execute_open(&mut self, signal: Signal, timestamp: i64) {
        let side = match signal.signal_type {
            SignalType::Buy => Side::Long,
            _ => Side::Short,
        };

        if self.portfolio.has_position(&signal.symbol) {
            self.reject(&signal, timestamp, "duplicate_position");
            return;
        }
        if self.portfolio.open_position_count() >= self.config.max_positions {
            self.reject(&signal, timestamp, "max_positions");
            return;
        }

        let flow = match side {
            Side::Long => Flow::Buy,
            Side::Short => Flow::Sell,
        };
        let fill = self.execution.fill_price(signal.price, flow);
        let notional = fill * signal.quantity as f64;
        let total_value = self.portfolio.total_value();

        if notional > self.config.max_position_size * total_value {
            self.reject(&signal, timestamp, "position_size_limit");
            return;
        }
        // With a stop loss the capital at risk is the stop distance,
        // otherwise the whole notional.
        let at_risk = notional * self.config.stop_loss_pct.unwrap_or(1.0);
        if at_risk > self.config.risk_per_trade * total_value {
            self.reject(&signal, timestamp, "risk_limit");
            return;
        }

        let commission = self.execution.commission(notional);
        let slippage = self.execution.slippage_cost(signal.price, signal.quantity);
        if let Err(err) = self.portfolio.open_position(
            &signal.symbol,
            side,
            signal.quantity,
            fill,
            commission,
            slippage,
            timestamp,
        ) {
            let reason = rejection_code(&err);
            self.reject(&signal, timestamp, reason);
        }
    }

    fn execute_close(&mut self, signal: Signal, timestamp: i64) {
        let Some(position) = self.portfolio.position(&signal.symbol) else {
            self.reject(&signal, timestamp, "position_not_found");
            return;
        };
        let flow = match position.side {
            Side::Long => Flow::Sell,
            Side::Short => Flow::Buy,
        };
        let fill = self.execution.fill_price(signal.price, flow);
        let commission = self.execution.commission(fill * signal.quantity as f64);
        let slippage = self.execution.slippage_cost(signal.price, signal.quantity);

        if let Err(err) = self.portfolio.close_position(
            &signal.symbol,
            signal.quantity,
            fill,
            commission,
            slippage,
            timestamp,
        ) {
            let reason = rejection_code(&err);
            self.reject(&signal, timestamp, reason);
        }
    }

    fn reject(&mut self, signal: &Signal, timestamp: i64, reason: &str) {
        self.rejections.push(SignalRejection {
            timestamp,
            symbol: signal.symbol.clone(),
            signal_type: signal.signal_type,
            quantity: signal.quantity,
            reason: reason.to_string(),
        });
    }
}

fn build_window<'a>(
    series: &'a BTreeMap<String, Vec<Bar>>,
    cursors: &BTreeMap<String, usize>,
) -> DataWindow<'a> {
    let mut window = DataWindow::new();
    for (symbol, bars) in series {
        let cursor = cursors.get(symbol).copied().unwrap_or(0);
        if cursor > 0 {
            window.insert(symbol.as_str(), &bars[..cursor]);
        }
    }
    window
}

fn rejection_code(err: &PortfolioError) -> &'static str {
    match err {
        PortfolioError::InsufficientCapital { .. } => "insufficient_capital",
        PortfolioError::DuplicatePosition(_) => "duplicate_position",
        PortfolioError::PositionNotFound(_) => "position_not_found",
        PortfolioError::OverClose { .. } => "over_close",
    }
}
