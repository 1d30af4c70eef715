use serde::{Deserialize, Serialize};

/// Whether the trader is buying or selling shares on a fill. Slippage is
/// always adverse: buyers pay up, sellers receive less.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum CommissionModel {
    /// Fixed amount per fill.
    Flat(f64),
    /// Fraction of fill notional.
    Rate(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub slippage_bps: f64,
    pub commission: CommissionModel,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_bps: 0.0,
            commission: CommissionModel::Flat(0.0),
        }
    }
}

impl ExecutionConfig {
    pub fn fill_price(&self, reference: f64, flow: Flow) -> f64 {
        let adjust = self.slippage_bps / 10_000.0;
        match flow {
            Flow::Buy => reference * (1.0 + adjust),
            Flow::Sell => reference * (1.0 - adjust),
        }
    }

    pub fn commission(&self, notional: f64) -> f64 {
        match self.commission {
            CommissionModel::Flat(amount) => amount,
            CommissionModel::Rate(rate) => notional * rate,
        }
    }

    /// Adverse price movement times quantity, for the cost tallies.
    pub fn slippage_cost(&self, reference: f64, quantity: u64) -> f64 {
        reference * quantity as f64 * self.slippage_bps / 10_000.0
    }
}
