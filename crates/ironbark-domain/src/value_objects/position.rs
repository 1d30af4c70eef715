use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};

/// An open holding, owned exclusively by the portfolio ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_timestamp: i64,
    /// Updated on every mark-to-market step.
    pub mark_price: f64,
    /// Realized P&L accumulated from partial closes.
    pub realized_pnl: f64,
}

impl Position {
    pub fn unrealized_pnl(&self) -> f64 {
        (self.mark_price - self.entry_price) * self.quantity as f64 * self.side.sign()
    }

    /// Signed contribution to portfolio value: positive for longs, a
    /// liability for shorts.
    pub fn market_value(&self) -> f64 {
        self.side.sign() * self.quantity as f64 * self.mark_price
    }
}

#[cfg(test)]
mod tests {
    use super::Position;
    use crate::value_objects::side::Side;

    #[test]
    fn unrealized_pnl_respects_side() {
        let mut pos = Position {
            symbol: "BHP".to_string(),
            side: Side::Long,
            quantity: 10,
            entry_price: 100.0,
            entry_timestamp: 1,
            mark_price: 110.0,
            realized_pnl: 0.0,
        };
        assert!((pos.unrealized_pnl() - 100.0).abs() < 1e-9);

        pos.side = Side::Short;
        assert!((pos.unrealized_pnl() + 100.0).abs() < 1e-9);
    }
}
