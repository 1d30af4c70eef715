use super::{DataWindow, Strategy};
use crate::entities::portfolio::Portfolio;
use crate::entities::strategy_config::StrategyConfig;
use crate::errors::{ConfigError, StrategyError};
use crate::services::indicators::rolling::WilderRsi;
use crate::value_objects::signal::{Signal, SignalType};
use std::collections::BTreeMap;

/// RSI neutral band; positions exit when RSI recovers through it.
const EXIT_LEVEL: f64 = 50.0;

/// Buys when RSI crosses below the oversold threshold, exits when RSI
/// crosses back above the neutral band. The overbought parameter is
/// validated as an upper bound on oversold but does not drive the coded
/// exit rule.
#[derive(Debug)]
pub struct MeanReversionRsi {
    rsi_period: usize,
    oversold: f64,
    position_size_pct: f64,
    state: BTreeMap<String, SymbolState>,
}

#[derive(Debug)]
struct SymbolState {
    rsi: WilderRsi,
    prev: f64,
}

impl MeanReversionRsi {
    pub fn new(rsi_period: usize, oversold: f64, position_size_pct: f64) -> Self {
        Self {
            rsi_period,
            oversold,
            position_size_pct,
            state: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Result<Self, ConfigError> {
        let period = config.param("rsi_period", 14.0).round() as usize;
        let oversold = config.param("oversold", 30.0);
        let overbought = config.param("overbought", 70.0);
        let pct = config.param("position_size_pct", 0.05);

        if period == 0 {
            return Err(ConfigError::Invalid(
                "rsi_reversion rsi_period must be positive".to_string(),
            ));
        }
        if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
            return Err(ConfigError::Invalid(format!(
                "rsi_reversion requires 0 < oversold < overbought < 100, got {}/{}",
                oversold, overbought
            )));
        }
        if !(pct > 0.0 && pct <= 1.0) {
            return Err(ConfigError::Invalid(
                "rsi_reversion position_size_pct must be in (0, 1]".to_string(),
            ));
        }
        Ok(Self::new(period, oversold, pct))
    }
}

impl Strategy for MeanReversionRsi {
    fn name(&self) -> &str {
        "rsi_reversion"
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
                    rsi: WilderRsi::new(self.rsi_period),
                    // Neutral until the indicator warms up, so the first
                    // defined value below the threshold counts as a cross.
                    prev: EXIT_LEVEL,
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

            let Some(rsi) = state.rsi.update(bar.close) else {
                continue;
            };
            let prev = state.prev;
            state.prev = rsi;

            if prev >= self.oversold && rsi < self.oversold && !portfolio.has_position(symbol) {
                let quantity =
                    (self.position_size_pct * portfolio.total_value() / bar.close).floor() as u64;
                if quantity > 0 {
                    signals.push(Signal::market(
                        symbol,
                        SignalType::Buy,
                        bar.close,
                        quantity,
                        timestamp,
                        0.6,
                        format!("rsi oversold: {:.2} < {:.2}", rsi, self.oversold),
                    ));
                }
            } else if prev < EXIT_LEVEL && rsi >= EXIT_LEVEL {
                if let Some(position) = portfolio.position(symbol) {
                    signals.push(Signal::market(
                        symbol,
                        SignalType::Close,
                        bar.close,
                        position.quantity,
                        timestamp,
                        0.6,
                        format!("rsi recovered: {:.2} >= {:.2}", rsi, EXIT_LEVEL),
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
    use crate::value_objects::side::Side;

    fn bar(timestamp: i64, close: f64) -> Bar {
        Bar {
            symbol: "CSL".to_string(),
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1,
        }
    }

    #[test]
    fn one_buy_on_the_drop_one_close_on_recovery() {
        // 16 falling closes push RSI to 0, then a sustained recovery lifts
        // it back through the neutral band.
        let mut closes: Vec<f64> = (0..16).map(|i| 200.0 - 5.0 * i as f64).collect();
        closes.extend((0..12).map(|i| 125.0 + 10.0 * i as f64));
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i as i64 + 1, *c))
            .collect();

        let mut strategy = MeanReversionRsi::new(14, 30.0, 0.1);
        strategy
            .initialize(&["CSL".to_string()], 1, bars.len() as i64)
            .unwrap();

        let mut portfolio = Portfolio::new(100_000.0);
        let mut buys = 0;
        let mut exits = 0;

        for i in 0..bars.len() {
            let mut window = DataWindow::new();
            window.insert("CSL", &bars[..=i]);
            let timestamp = bars[i].timestamp;
            for signal in strategy
                .generate_signals(&window, timestamp, &portfolio)
                .unwrap()
            {
                match signal.signal_type {
                    SignalType::Buy => {
                        buys += 1;
                        portfolio
                            .open_position(
                                &signal.symbol,
                                Side::Long,
                                signal.quantity,
                                signal.price,
                                0.0,
                                0.0,
                                timestamp,
                            )
                            .unwrap();
                    }
                    SignalType::Close => {
                        exits += 1;
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

        assert_eq!(buys, 1);
        assert_eq!(exits, 1);
        assert!(!portfolio.has_position("CSL"));
    }

    #[test]
    fn from_config_rejects_crossed_thresholds() {
        let config = StrategyConfig::new("rsi_reversion")
            .with_param("oversold", 80.0)
            .with_param("overbought", 20.0);
        assert!(MeanReversionRsi::from_config(&config).is_err());
    }
}
