//! Post-run performance metrics, computed once over the equity curve and
//! trade log. Metrics whose denominator is empty (no trades, no losers,
//! zero variance) are reported as `None`, never as zero.

use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::TradeRecord;
use chrono::DateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct AnalyticsConfig {
    /// Annual risk-free rate subtracted from returns before Sharpe.
    pub risk_free_rate: f64,
    /// Trading periods per year used for annualization, 252 for daily bars.
    pub periods_per_year: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            periods_per_year: 252.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_volatility: Option<f64>,
    pub sharpe: Option<f64>,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub largest_win: Option<f64>,
    pub largest_loss: Option<f64>,
    pub avg_holding_days: Option<f64>,
    pub max_consecutive_losses: usize,
}

pub fn analyze(
    equity: &[EquityPoint],
    trades: &[TradeRecord],
    initial_capital: f64,
    config: &AnalyticsConfig,
) -> PerformanceReport {
    let final_value = equity
        .last()
        .map(|p| p.total_value)
        .unwrap_or(initial_capital);
    let total_return = if initial_capital > 0.0 {
        final_value / initial_capital - 1.0
    } else {
        0.0
    };

    let returns = daily_returns(equity);
    let (sharpe, volatility) = sharpe_and_volatility(&returns, config);

    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.realized_pnl > 0.0)
        .map(|t| t.realized_pnl)
        .collect();
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.realized_pnl < 0.0)
        .map(|t| t.realized_pnl)
        .collect();

    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum();

    let mut consecutive = 0usize;
    let mut max_consecutive_losses = 0usize;
    for trade in trades {
        if trade.realized_pnl < 0.0 {
            consecutive += 1;
            max_consecutive_losses = max_consecutive_losses.max(consecutive);
        } else {
            consecutive = 0;
        }
    }

    PerformanceReport {
        initial_capital,
        final_value,
        total_return,
        annualized_volatility: volatility,
        sharpe,
        max_drawdown: max_drawdown(equity),
        total_trades: trades.len(),
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate: if trades.is_empty() {
            None
        } else {
            Some(wins.len() as f64 / trades.len() as f64)
        },
        profit_factor: if gross_loss < 0.0 {
            Some(gross_profit / gross_loss.abs())
        } else {
            None
        },
        avg_win: mean(&wins),
        avg_loss: mean(&losses),
        largest_win: wins.iter().copied().fold(None, fold_max),
        largest_loss: losses.iter().copied().fold(None, fold_min),
        avg_holding_days: if trades.is_empty() {
            None
        } else {
            let total: i64 = trades.iter().map(|t| t.holding_secs).sum();
            Some(total as f64 / trades.len() as f64 / 86_400.0)
        },
        max_consecutive_losses,
    }
}

/// Percentage change of the equity series resampled to one value per
/// calendar day (the last snapshot of each day).
pub fn daily_returns(equity: &[EquityPoint]) -> Vec<f64> {
    let mut daily: Vec<f64> = Vec::new();
    let mut current_day = None;

    for point in equity {
        let day = DateTime::from_timestamp(point.timestamp, 0).map(|dt| dt.date_naive());
        if day == current_day && !daily.is_empty() {
            *daily.last_mut().unwrap() = point.total_value;
        } else {
            daily.push(point.total_value);
            current_day = day;
        }
    }

    daily
        .windows(2)
        .filter(|pair| pair[0] > 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

pub fn max_drawdown(equity: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for point in equity {
        if point.total_value > peak {
            peak = point.total_value;
        } else if peak > 0.0 {
            worst = worst.max((peak - point.total_value) / peak);
        }
    }
    worst
}

fn sharpe_and_volatility(
    returns: &[f64],
    config: &AnalyticsConfig,
) -> (Option<f64>, Option<f64>) {
    if returns.len() < 2 {
        return (None, None);
    }

    let rf_per_period = config.risk_free_rate / config.periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - rf_per_period).collect();
    let mean = excess.iter().sum::<f64>() / excess.len() as f64;
    let var = excess
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / (excess.len() as f64 - 1.0);
    let std = var.sqrt();

    let volatility = Some(std * config.periods_per_year.sqrt());
    if std == 0.0 {
        // Flat returns: risk-adjusted return is undefined, not zero.
        return (None, volatility);
    }
    (Some(mean / std * config.periods_per_year.sqrt()), volatility)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn fold_max(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

fn fold_min(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.min(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::side::Side;

    const DAY: i64 = 86_400;

    fn point(day: i64, value: f64) -> EquityPoint {
        EquityPoint {
            timestamp: day * DAY,
            total_value: value,
            cash: value,
            position_value: 0.0,
        }
    }

    fn trade(pnl: f64) -> TradeRecord {
        TradeRecord {
            symbol: "BHP".to_string(),
            side: Side::Long,
            quantity: 1,
            entry_price: 100.0,
            entry_timestamp: 0,
            exit_price: 100.0 + pnl,
            exit_timestamp: 2 * DAY,
            realized_pnl: pnl,
            return_pct: pnl / 100.0,
            holding_secs: 2 * DAY,
            commission: 0.0,
        }
    }

    #[test]
    fn flat_equity_reports_undefined_sharpe() {
        let equity: Vec<EquityPoint> = (0..10).map(|d| point(d, 50_000.0)).collect();
        let report = analyze(&equity, &[], 50_000.0, &AnalyticsConfig::default());
        assert_eq!(report.sharpe, None);
        assert_eq!(report.total_return, 0.0);
        assert_eq!(report.win_rate, None);
        assert_eq!(report.max_drawdown, 0.0);
    }

    #[test]
    fn total_return_and_drawdown() {
        let equity = vec![
            point(0, 100_000.0),
            point(1, 110_000.0),
            point(2, 88_000.0),
            point(3, 120_000.0),
        ];
        let report = analyze(&equity, &[], 100_000.0, &AnalyticsConfig::default());
        assert!((report.total_return - 0.2).abs() < 1e-12);
        assert!((report.max_drawdown - 0.2).abs() < 1e-12);
    }

    #[test]
    fn intraday_snapshots_collapse_to_one_daily_value() {
        let equity = vec![
            point(0, 100.0),
            EquityPoint {
                timestamp: DAY + 3600,
                total_value: 150.0,
                cash: 150.0,
                position_value: 0.0,
            },
            EquityPoint {
                timestamp: DAY + 7200,
                total_value: 110.0,
                cash: 110.0,
                position_value: 0.0,
            },
        ];
        let returns = daily_returns(&equity);
        // Only the last snapshot of day two counts.
        assert_eq!(returns, vec![0.1]);
    }

    #[test]
    fn trade_statistics() {
        let trades = vec![trade(10.0), trade(-5.0), trade(-3.0), trade(20.0)];
        let equity = vec![point(0, 100.0), point(1, 122.0)];
        let report = analyze(&equity, &trades, 100.0, &AnalyticsConfig::default());

        assert_eq!(report.total_trades, 4);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 2);
        assert_eq!(report.win_rate, Some(0.5));
        assert!((report.profit_factor.unwrap() - 3.75).abs() < 1e-12);
        assert_eq!(report.avg_win, Some(15.0));
        assert_eq!(report.avg_loss, Some(-4.0));
        assert_eq!(report.largest_win, Some(20.0));
        assert_eq!(report.largest_loss, Some(-5.0));
        assert_eq!(report.max_consecutive_losses, 2);
        assert_eq!(report.avg_holding_days, Some(2.0));
    }

    #[test]
    fn profit_factor_undefined_without_losers() {
        let trades = vec![trade(10.0), trade(5.0)];
        let equity = vec![point(0, 100.0), point(1, 115.0)];
        let report = analyze(&equity, &trades, 100.0, &AnalyticsConfig::default());
        assert_eq!(report.profit_factor, None);
        assert_eq!(report.win_rate, Some(1.0));
    }
}
