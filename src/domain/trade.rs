//! Paper trade records and the pure P&L / exit arithmetic on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract multiplier: 1.0 lots of position size moves $100k per unit of
/// price. Applied uniformly, metals included.
pub const PIP_VALUE: f64 = 100_000.0;

/// ATR multiple used when trailing a stop behind price.
pub const TRAILING_ATR_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    Closed,
    StopLoss,
    TakeProfit,
}

impl TradeStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, TradeStatus::Open)
    }
}

/// Why a trade left the book. The terminal status records the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Manual,
    StopLoss,
    TakeProfit,
}

impl CloseReason {
    pub fn terminal_status(&self) -> TradeStatus {
        match self {
            CloseReason::Manual => TradeStatus::Closed,
            CloseReason::StopLoss => TradeStatus::StopLoss,
            CloseReason::TakeProfit => TradeStatus::TakeProfit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperTrade {
    pub id: i64,
    pub user_id: i64,
    pub instrument_id: i64,
    pub signal_id: Option<i64>,
    pub trade_type: TradeType,
    pub position_size: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub status: TradeStatus,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PaperTrade {
    /// Dollar risk currently committed by this position: distance to the
    /// stop times size. A missing stop reads as 0.0, so the full entry
    /// price counts toward risk.
    pub fn committed_risk(&self) -> f64 {
        (self.entry_price - self.stop_loss.unwrap_or(0.0)).abs() * self.position_size
    }

    /// Mark-to-market P&L at `price`, realized or not.
    pub fn pnl_at(&self, price: f64) -> f64 {
        realized_pnl(self.trade_type, self.entry_price, price, self.position_size)
    }

    /// Whether `price` crosses the stop or target. Levels at or below zero
    /// are treated as unset.
    pub fn exit_trigger(&self, price: f64) -> Option<CloseReason> {
        let stop = self.stop_loss.unwrap_or(0.0);
        let target = self.take_profit.unwrap_or(0.0);
        match self.trade_type {
            TradeType::Buy => {
                if stop > 0.0 && price <= stop {
                    Some(CloseReason::StopLoss)
                } else if target > 0.0 && price >= target {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
            TradeType::Sell => {
                if stop > 0.0 && price >= stop {
                    Some(CloseReason::StopLoss)
                } else if target > 0.0 && price <= target {
                    Some(CloseReason::TakeProfit)
                } else {
                    None
                }
            }
        }
    }

    /// Trailing stop that would tighten the current one, if any. Longs only
    /// ever move the stop up, shorts only down.
    pub fn trailing_stop_candidate(&self, price: f64, atr: f64) -> Option<f64> {
        let current = self.stop_loss.unwrap_or(0.0);
        match self.trade_type {
            TradeType::Buy => {
                let candidate = price - atr * TRAILING_ATR_MULTIPLIER;
                (candidate > current).then_some(candidate)
            }
            TradeType::Sell => {
                let candidate = price + atr * TRAILING_ATR_MULTIPLIER;
                (candidate < current).then_some(candidate)
            }
        }
    }
}

/// P&L of a position closed at `exit`: price move times size times the
/// contract multiplier, negated for shorts.
pub fn realized_pnl(trade_type: TradeType, entry: f64, exit: f64, size: f64) -> f64 {
    match trade_type {
        TradeType::Buy => (exit - entry) * size * PIP_VALUE,
        TradeType::Sell => (entry - exit) * size * PIP_VALUE,
    }
}

/// Trade fields as handed to the store; the store assigns `id` and the trade
/// starts open with no exit fields.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub user_id: i64,
    pub instrument_id: i64,
    pub signal_id: Option<i64>,
    pub trade_type: TradeType,
    pub position_size: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
}

/// Partial update applied to a stored trade. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct TradePatch {
    pub stop_loss: Option<f64>,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub status: Option<TradeStatus>,
    pub closed_at: Option<DateTime<Utc>>,
}
