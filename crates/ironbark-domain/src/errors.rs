use thiserror::Error;

/// Rejected before any simulation step runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid strategy config: {0}")]
    Invalid(String),
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
    #[error("no symbols configured")]
    EmptySymbols,
    #[error("start {start} is not before end {end}")]
    InvalidDateRange { start: i64, end: i64 },
}

/// Fatal to a run: a backtest over partial data would produce misleading
/// results, so these are never downgraded to warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("no bars for {symbol} between {start} and {end}")]
    NotFound {
        symbol: String,
        start: i64,
        end: i64,
    },
    #[error("storage error for {symbol}: {message}")]
    Storage { symbol: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    #[error("insufficient capital: required {required:.2}, available {available:.2}")]
    InsufficientCapital { required: f64, available: f64 },
    #[error("position already open for {0}")]
    DuplicatePosition(String),
    #[error("no open position for {0}")]
    PositionNotFound(String),
    #[error("close quantity {requested} exceeds held quantity {held}")]
    OverClose { requested: u64, held: u64 },
}

/// Raised from strategy code. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct StrategyError {
    pub message: String,
}

impl StrategyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("strategy '{strategy}' failed at {timestamp}: {source}")]
    Strategy {
        strategy: String,
        timestamp: i64,
        source: StrategyError,
    },
    #[error("run cancelled at {timestamp}")]
    Cancelled { timestamp: i64 },
    #[error("engine is not initialized")]
    NotInitialized,
}
