pub mod backtesting;
pub mod config;
pub mod optimization;
pub mod reporting;
pub mod shared;
pub mod validation;
