//! Performance statistics over closed trades.

use super::trade::PaperTrade;
use crate::domain::risk::ACCOUNT_BALANCE;

/// Annualization factor for the Sharpe ratio (trading days per year).
const TRADING_DAYS: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradingStatistics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub average_pnl: f64,
    /// Percentage of closed trades with positive P&L.
    pub win_rate: f64,
    /// Gross profit over gross loss; zero when there are no losses.
    pub profit_factor: f64,
    /// Largest peak-to-trough drop of the cumulative P&L curve, in dollars.
    pub max_drawdown: f64,
    /// Annualized, over per-trade returns against the account balance.
    pub sharpe_ratio: f64,
}

impl TradingStatistics {
    /// Compute over the closed trades in `trades`, in the order given. Open
    /// trades and trades with no recorded P&L are ignored.
    pub fn compute(trades: &[PaperTrade]) -> Self {
        let pnls: Vec<f64> = trades
            .iter()
            .filter(|t| !t.status.is_open())
            .filter_map(|t| t.pnl)
            .collect();

        if pnls.is_empty() {
            return TradingStatistics::default();
        }

        let winning: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
        let losing: f64 = pnls.iter().filter(|p| **p < 0.0).sum();
        let winning_trades = pnls.iter().filter(|p| **p > 0.0).count();
        let losing_trades = pnls.iter().filter(|p| **p < 0.0).count();
        let total_pnl: f64 = pnls.iter().sum();

        let gross_loss = losing.abs();
        let profit_factor = if gross_loss > 0.0 {
            winning / gross_loss
        } else {
            0.0
        };

        let mut peak = 0.0_f64;
        let mut max_drawdown = 0.0_f64;
        let mut running = 0.0_f64;
        for pnl in &pnls {
            running += pnl;
            if running > peak {
                peak = running;
            }
            let drawdown = peak - running;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        let returns: Vec<f64> = pnls.iter().map(|p| p / ACCOUNT_BALANCE).collect();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let std_dev = variance.sqrt();
        let sharpe_ratio = if std_dev > 0.0 {
            mean / std_dev * TRADING_DAYS.sqrt()
        } else {
            0.0
        };

        TradingStatistics {
            total_trades: pnls.len(),
            winning_trades,
            losing_trades,
            total_pnl,
            average_pnl: total_pnl / pnls.len() as f64,
            win_rate: winning_trades as f64 / pnls.len() as f64 * 100.0,
            profit_factor,
            max_drawdown,
            sharpe_ratio,
        }
    }
}

/// Mark-to-market account valuation.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValue {
    pub total_value: f64,
    pub cash_balance: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

impl PortfolioValue {
    pub fn from_pnl(realized_pnl: f64, unrealized_pnl: f64) -> Self {
        PortfolioValue {
            total_value: ACCOUNT_BALANCE + realized_pnl + unrealized_pnl,
            cash_balance: ACCOUNT_BALANCE + realized_pnl,
            unrealized_pnl,
            realized_pnl,
        }
    }
}
