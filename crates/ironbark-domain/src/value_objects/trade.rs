use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};

/// Immutable closed-position record, appended when a position (or part of
/// one) is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub entry_price: f64,
    pub entry_timestamp: i64,
    pub exit_price: f64,
    pub exit_timestamp: i64,
    pub realized_pnl: f64,
    /// Fractional return on the entry notional, signed by side.
    pub return_pct: f64,
    pub holding_secs: i64,
    /// Commission charged on the closing fill.
    pub commission: f64,
}
