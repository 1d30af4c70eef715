use super::{DataWindow, Strategy};
use crate::entities::portfolio::Portfolio;
use crate::entities::strategy_config::StrategyConfig;
use crate::errors::{ConfigError, StrategyError};
use crate::value_objects::signal::{Signal, SignalType};
use std::collections::BTreeMap;

/// Benchmark strategy: opens one position per tracked symbol at its first
/// available bar, sized against initial capital, and never exits.
#[derive(Debug)]
pub struct BuyAndHold {
    allocation_per_symbol: f64,
    bought: BTreeMap<String, bool>,
}

impl BuyAndHold {
    pub fn new(allocation_per_symbol: f64) -> Self {
        Self {
            allocation_per_symbol,
            bought: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        let allocation = config.param("allocation_per_symbol", 0.9);
        if !(allocation > 0.0 && allocation <= 1.0) {
            return Err(ConfigError::Invalid(
                "buy_and_hold allocation_per_symbol must be in (0, 1]".to_string(),
            ));
        }
        Ok(Self::new(allocation))
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn initialize(
        &mut self,
        symbols: &[String],
        _start: i64,
        _end: i64,
    ) -> Result<(), StrategyError> {
        self.bought.clear();
        for symbol in symbols {
            self.bought.insert(symbol.clone(), false);
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

        for (symbol, bought) in self.bought.iter_mut() {
            if *bought || !window.has_bar_at(symbol, timestamp) {
                continue;
            }
            let bar = window
                .latest(symbol)
                .ok_or_else(|| StrategyError::new(format!("no bars for {}", symbol)))?;

            let quantity = (self.allocation_per_symbol * portfolio.initial_capital() / bar.close)
                .floor() as u64;
            *bought = true;
            if quantity > 0 {
                signals.push(Signal::market(
                    symbol,
                    SignalType::Buy,
                    bar.close,
                    quantity,
                    timestamp,
                    1.0,
                    "initial buy and hold allocation".to_string(),
                ));
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
    fn buys_each_symbol_once_at_first_bar() {
        let mut strategy = BuyAndHold::new(0.5);
        strategy
            .initialize(&["BHP".to_string(), "CSL".to_string()], 1, 10)
            .unwrap();
        let portfolio = Portfolio::new(100_000.0);

        let bhp = [bar("BHP", 1, 100.0)];
        let csl = [bar("CSL", 2, 250.0)];

        let mut window = DataWindow::new();
        window.insert("BHP", &bhp);
        let signals = strategy.generate_signals(&window, 1, &portfolio).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].symbol, "BHP");
        assert_eq!(signals[0].quantity, 500);

        // CSL's first bar arrives a step later.
        let mut window = DataWindow::new();
        window.insert("BHP", &bhp);
        window.insert("CSL", &csl);
        let signals = strategy.generate_signals(&window, 2, &portfolio).unwrap();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].symbol, "CSL");
        assert_eq!(signals[0].quantity, 200);

        // Never again.
        let signals = strategy.generate_signals(&window, 3, &portfolio).unwrap();
        assert!(signals.is_empty());
    }
}
