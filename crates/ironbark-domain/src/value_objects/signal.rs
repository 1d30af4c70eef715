use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
}

/// A strategy's instruction for one symbol at one timestamp. Consumed by the
/// engine on the step it was produced; never persisted as a standing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub signal_type: SignalType,
    /// Reference price at signal time, typically the last close.
    pub price: f64,
    pub quantity: u64,
    pub timestamp: i64,
    /// Advisory only, in [0, 1]. The engine validates but does not act on it.
    pub confidence: f64,
    pub order_type: OrderType,
    pub reason: String,
}

impl Signal {
    pub fn market(
        symbol: &str,
        signal_type: SignalType,
        price: f64,
        quantity: u64,
        timestamp: i64,
        confidence: f64,
        reason: String,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            signal_type,
            price,
            quantity,
            timestamp,
            confidence,
            order_type: OrderType::Market,
            reason,
        }
    }
}
