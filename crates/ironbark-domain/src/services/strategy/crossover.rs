use super::{DataWindow, Strategy};
use crate::entities::portfolio::Portfolio;
use crate::entities::strategy_config::StrategyConfig;
use crate::errors::{ConfigError, StrategyError};
use crate::services::indicators::rolling::RollingSma;
use crate::value_objects::signal::{Signal, SignalType};
use std::collections::BTreeMap;

/// Buys when the short moving average crosses above the long one, closes
/// the long position on the opposite cross.
#[derive(Debug)]
pub struct MovingAverageCrossover {
    short_window: usize,
    long_window: usize,
    position_size_pct: f64,
    state: BTreeMap<String, SymbolState>,
}

#[derive(Debug)]
struct SymbolState {
    short: RollingSma,
    long: RollingSma,
    prev: Option<(f64, f64)>,
    curr: Option<(f64, f64)>,
}

impl MovingAverageCrossover {
    pub fn new(short_window: usize, long_window: usize, position_size_pct: f64) -> Self {
        Self {
            short_window,
            long_window,
            position_size_pct,
            state: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        let short = config.param("short_window", 20.0).round() as usize;
        let long = config.param("long_window", 50.0).round() as usize;
        let pct = config.param("position_size_pct", 0.1);

        if short == 0 || long == 0 || short >= long {
            return Err(ConfigError::Invalid(format!(
                "ma_crossover requires 0 < short_window < long_window, got {}/{}",
                short, long
            )));
        }
        if !(pct > 0.0 && pct <= 1.0) {
            return Err(ConfigError::Invalid(
                "ma_crossover position_size_pct must be in (0, 1]".to_string(),
            ));
        }
        Ok(Self::new(short, long, pct))
    }
}

impl Strategy for MovingAverageCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn initialize(
        &mut self,
        symbols: &[String],
        _start: i64,
        _end: i64,
    ) -> Result<(), StrategyError> {
        self.state.clear();
        for symbol in symbols {
            self.state.insert(
                symbol.clone(),
                SymbolState {
                    short: RollingSma::new(self.short_window),
                    long: RollingSma::new(self.long_window),
                    prev: None,
                    curr: None,
                },
            );
        }
        Ok(())
    }

    fn generate_signals(
        &mut self,
        window: &DataWindow,
        timestamp: i64,
        portfolio: &Portfolio,
    ) -> Result<Vec<Signal>, StrategyError> {
        let mut signals = Vec::new();

        for (symbol, state) in self.state.iter_mut() {
            if !window.has_bar_at(symbol, timestamp) {
                continue;
            }
            let bar = window
                .latest(symbol)
                .ok_or_else(|| StrategyError::new(format!("no bars for {}", symbol)))?;

            let short = state.short.update(bar.close);
            let long = state.long.update(bar.close);
            state.prev = state.curr;
            state.curr = match (short, long) {
                (Some(s), Some(l)) => Some((s, l)),
                _ => None,
            };

            let (Some((prev_short, prev_long)), Some((curr_short, curr_long))) =
                (state.prev, state.curr)
            else {
                continue;
            };

            let crossed_up = prev_short <= prev_long && curr_short > curr_long;
            let crossed_down = prev_short >= prev_long && curr_short < curr_long;

            if crossed_up && !portfolio.has_position(symbol) {
                let quantity =
                    (self.position_size_pct * portfolio.total_value() / bar.close).floor() as u64;
                if quantity > 0 {
                    signals.push(Signal::market(
                        symbol,
                        SignalType::Buy,
                        bar.close,
                        quantity,
                        timestamp,
                        0.7,
                        format!("ma crossover: {:.2} > {:.2}", curr_short, curr_long),
                    ));
                }
            } else if crossed_down {
                if let Some(position) = portfolio.position(symbol) {
                    signals.push(Signal::market(
                        symbol,
                        SignalType::Close,
                        bar.close,
                        position.quantity,
                        timestamp,
                        0.7,
                        format!("ma crossover: {:.2} < {:.2}", curr_short, curr_long),
                    ));
                }
            }
        }

        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::bar::Bar;

    fn bar(symbol: &str, timestamp: i64, close: f64) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn signals_fire_at_the_exact_cross_bars() {
        let closes = [10.0, 10.0, 10.0, 12.0, 14.0, 16.0, 10.0, 10.0, 10.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| bar("BHP", i as i64 + 1, *c))
            .collect();

        let mut strategy = MovingAverageCrossover::new(2, 3, 0.1);
        strategy
            .initialize(&["BHP".to_string()], 1, closes.len() as i64)
            .unwrap();

        let mut portfolio = Portfolio::new(100_000.0);
        let mut buys = Vec::new();
        let mut closes_seen = Vec::new();

        for i in 0..bars.len() {
            let mut window = DataWindow::new();
            window.insert("BHP", &bars[..=i]);
            let timestamp = bars[i].timestamp;
            let signals = strategy
                .generate_signals(&window, timestamp, &portfolio)
                .unwrap();
            for signal in signals {
                match signal.signal_type {
                    SignalType::Buy => {
                        buys.push(timestamp);
                        portfolio
                            .open_position(
                                &signal.symbol,
                                crate::value_objects::side::Side::Long,
                                signal.quantity,
                                signal.price,
                                0.0,
                                0.0,
                                timestamp,
                            )
                            .unwrap();
                    }
                    SignalType::Close => {
                        closes_seen.push(timestamp);
                        portfolio
                            .close_position(
                                &signal.symbol,
                                signal.quantity,
                                signal.price,
                                0.0,
                                0.0,
                                timestamp,
                            )
                            .unwrap();
                    }
                    SignalType::Sell => panic!("unexpected sell"),
                }
            }
        }

        // SMA(2) first exceeds SMA(3) on the fourth bar, reverses on the
        // seventh.
        assert_eq!(buys, vec![4]);
        assert_eq!(closes_seen, vec![7]);
    }

    #[test]
    fn from_config_rejects_inverted_windows() {
        let config = StrategyConfig::new("ma_crossover")
            .with_param("short_window", 50.0)
            .with_param("long_window", 20.0);
        assert!(MovingAverageCrossover::from_config(&config).is_err());
    }
}
