use serde::{Deserialize, Serialize};

/// One portfolio-value snapshot, taken once per engine step after fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub total_value: f64,
    pub cash: f64,
    pub position_value: f64,
}
