use crate::errors::PortfolioError;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::position::Position;
use crate::value_objects::side::Side;
use crate::value_objects::trade::TradeRecord;
use std::collections::BTreeMap;

/// Ledger of cash, open positions and closed trades for one backtest run.
///
/// Over-allocation is hard-rejected: `open_position` fails rather than let
/// cash go negative. Shorts post the full notional as margin, so the same
/// capital check applies to both sides.
#[derive(Debug)]
pub struct Portfolio {
    initial_capital: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    total_commission: f64,
    total_slippage: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            total_commission: 0.0,
            total_slippage: 0.0,
        }
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    pub fn position_value(&self) -> f64 {
        self.positions.values().map(Position::market_value).sum()
    }

    /// Cash plus the signed market value of every open position.
    pub fn total_value(&self) -> f64 {
        self.cash + self.position_value()
    }

    pub fn open_position(
        &mut self,
        symbol: &str,
        side: Side,
        quantity: u64,
        price: f64,
        commission: f64,
        slippage: f64,
        timestamp: i64,
    ) -> Result<(), PortfolioError> {
        if self.positions.contains_key(symbol) {
            return Err(PortfolioError::DuplicatePosition(symbol.to_string()));
        }

        let notional = quantity as f64 * price;
        let required = notional + commission;
        if required > self.cash {
            return Err(PortfolioError::InsufficientCapital {
                required,
                available: self.cash,
            });
        }

        match side {
            Side::Long => self.cash -= notional + commission,
            // Short proceeds are credited, then offset by the negative
            // position value until the position is covered.
            Side::Short => self.cash += notional - commission,
        }
        self.total_commission += commission;
        self.total_slippage += slippage;

        self.positions.insert(
            symbol.to_string(),
            Position {
                symbol: symbol.to_string(),
                side,
                quantity,
                entry_price: price,
                entry_timestamp: timestamp,
                mark_price: price,
                realized_pnl: 0.0,
            },
        );
        Ok(())
    }

    /// Closes up to `quantity` of the open position, appending one trade
    /// record. Realized P&L is (exit - entry) * quantity * side sign; the
    /// commission reduces cash but not the recorded P&L.
    pub fn close_position(
        &mut self,
        symbol: &str,
        quantity: u64,
        price: f64,
        commission: f64,
        slippage: f64,
        timestamp: i64,
    ) -> Result<f64, PortfolioError> {
        let position = self
            .positions
            .get_mut(symbol)
            .ok_or_else(|| PortfolioError::PositionNotFound(symbol.to_string()))?;

        if quantity > position.quantity {
            return Err(PortfolioError::OverClose {
                requested: quantity,
                held: position.quantity,
            });
        }

        let qty = quantity as f64;
        let pnl = (price - position.entry_price) * qty * position.side.sign();
        match position.side {
            Side::Long => self.cash += qty * price - commission,
            // Covering a short pays back the borrowed notional.
            Side::Short => self.cash -= qty * price + commission,
        }
        self.total_commission += commission;
        self.total_slippage += slippage;
        position.realized_pnl += pnl;

        let entry_notional = position.entry_price * qty;
        let record = TradeRecord {
            symbol: symbol.to_string(),
            side: position.side,
            quantity,
            entry_price: position.entry_price,
            entry_timestamp: position.entry_timestamp,
            exit_price: price,
            exit_timestamp: timestamp,
            realized_pnl: pnl,
            return_pct: if entry_notional > 0.0 {
                pnl / entry_notional
            } else {
                0.0
            },
            holding_secs: timestamp - position.entry_timestamp,
            commission,
        };

        position.quantity -= quantity;
        if position.quantity == 0 {
            self.positions.remove(symbol);
        }
        self.trades.push(record);
        Ok(pnl)
    }

    /// Updates each open position's mark price and appends one equity
    /// snapshot. Must be called exactly once per engine step, after fills,
    /// so the snapshot reflects post-trade state.
    pub fn mark_to_market(&mut self, prices: &BTreeMap<String, f64>, timestamp: i64) {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(price) = prices.get(symbol) {
                position.mark_price = *price;
            }
        }

        let position_value = self.position_value();
        self.equity_curve.push(EquityPoint {
            timestamp,
            total_value: self.cash + position_value,
            cash: self.cash,
            position_value,
        });
    }
}
