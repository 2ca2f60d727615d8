//! Trade lifecycle: signal execution, exit monitoring, closure, and the
//! account views derived from trade history.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::fusion::DEFAULT_ATR;
use super::instrument::Timeframe;
use super::risk::{RiskValidator, Verdict};
use super::signal::Direction;
use super::stats::{PortfolioValue, TradingStatistics};
use super::trade::{CloseReason, NewTrade, PaperTrade, TradePatch, TradeType};
use crate::domain::error::FxforgeError;
use crate::ports::market_port::{IndicatorStore, MarketDataStore};
use crate::ports::signal_port::SignalStore;
use crate::ports::trade_port::TradeStore;

/// How many trades the history views page through.
const HISTORY_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Opened(PaperTrade),
    Rejected { reason: String },
}

/// What one exit sweep did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitSummary {
    pub closed: usize,
    pub stops_trailed: usize,
}

/// What happened to one trade during a sweep.
enum TradeSweep {
    Closed,
    Trailed,
    Held,
}

pub struct TradeLifecycleManager {
    signals: Arc<dyn SignalStore>,
    trades: Arc<dyn TradeStore>,
    market: Arc<dyn MarketDataStore>,
    indicators: Arc<dyn IndicatorStore>,
    risk: RiskValidator,
}

impl TradeLifecycleManager {
    pub fn new(
        signals: Arc<dyn SignalStore>,
        trades: Arc<dyn TradeStore>,
        market: Arc<dyn MarketDataStore>,
        indicators: Arc<dyn IndicatorStore>,
        risk: RiskValidator,
    ) -> Self {
        TradeLifecycleManager {
            signals,
            trades,
            market,
            indicators,
            risk,
        }
    }

    /// Open a paper trade from an active signal. Sizing targets 1% account
    /// risk against the signal's stop; the risk gate may clamp or reject.
    pub fn execute_trade(
        &self,
        signal_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ExecutionOutcome, FxforgeError> {
        let active = self.signals.active_signals()?;
        let Some(signal) = active.into_iter().find(|s| s.id == signal_id) else {
            return Ok(ExecutionOutcome::Rejected {
                reason: "Signal not found".to_string(),
            });
        };

        let trade_type = match signal.signal_type {
            Direction::Buy => TradeType::Buy,
            Direction::Sell => TradeType::Sell,
            Direction::Hold => {
                return Ok(ExecutionOutcome::Rejected {
                    reason: "Signal is not directional".to_string(),
                });
            }
        };

        let position_size = self.risk.calculate_position_size(
            user_id,
            signal.entry_price,
            signal.stop_loss,
            1.0,
        )?;

        let intent = super::risk::TradeIntent {
            user_id,
            instrument_id: signal.instrument_id,
            trade_type,
            position_size,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
        };

        let final_size = match self.risk.validate_trade(&intent, now)? {
            Verdict::Rejected { reason } => {
                return Ok(ExecutionOutcome::Rejected { reason });
            }
            Verdict::Approved { adjusted_size } => adjusted_size.unwrap_or(position_size),
        };

        let trade = self.trades.create(NewTrade {
            user_id,
            instrument_id: signal.instrument_id,
            signal_id: Some(signal.id),
            trade_type,
            position_size: final_size,
            entry_price: signal.entry_price,
            stop_loss: Some(signal.stop_loss),
            take_profit: Some(signal.target_price),
            opened_at: now,
        })?;

        info!(
            trade_id = trade.id,
            signal_id,
            %trade_type,
            size = final_size,
            "paper trade opened"
        );
        Ok(ExecutionOutcome::Opened(trade))
    }

    /// Close an open trade at `exit_price`, realizing its P&L.
    pub fn close_trade(
        &self,
        user_id: i64,
        trade_id: i64,
        exit_price: f64,
        reason: CloseReason,
        now: DateTime<Utc>,
    ) -> Result<PaperTrade, FxforgeError> {
        let history = self.trades.history(user_id, HISTORY_LIMIT)?;
        let trade = history
            .into_iter()
            .find(|t| t.id == trade_id)
            .ok_or(FxforgeError::TradeNotFound { id: trade_id })?;

        if !trade.status.is_open() {
            return Err(FxforgeError::TradeNotOpen { id: trade_id });
        }

        let pnl = trade.pnl_at(exit_price);
        let updated = self.trades.update(
            trade_id,
            TradePatch {
                exit_price: Some(exit_price),
                pnl: Some(pnl),
                status: Some(reason.terminal_status()),
                closed_at: Some(now),
                ..TradePatch::default()
            },
        )?;

        info!(trade_id, pnl, ?reason, "paper trade closed");
        Ok(updated)
    }

    /// Sweep open trades against the latest 1-minute close: close anything
    /// whose stop or target is hit, trail the stop on everything else. Trades
    /// with no 1-minute data yet are skipped, and a store failure on one
    /// trade is logged and the sweep continues with the rest.
    pub fn check_exits(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ExitSummary, FxforgeError> {
        let mut summary = ExitSummary::default();

        for trade in self.trades.open_trades(user_id)? {
            match self.sweep_trade(&trade, user_id, now) {
                Ok(TradeSweep::Closed) => summary.closed += 1,
                Ok(TradeSweep::Trailed) => summary.stops_trailed += 1,
                Ok(TradeSweep::Held) => {}
                Err(e) => warn!(trade_id = trade.id, error = %e, "exit check failed"),
            }
        }

        Ok(summary)
    }

    fn sweep_trade(
        &self,
        trade: &PaperTrade,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<TradeSweep, FxforgeError> {
        let Some(bar) = self.market.latest_bar(trade.instrument_id, Timeframe::M1)? else {
            return Ok(TradeSweep::Held);
        };
        let price = bar.close;

        if let Some(reason) = trade.exit_trigger(price) {
            self.close_trade(user_id, trade.id, price, reason, now)?;
            return Ok(TradeSweep::Closed);
        }

        let atr = self
            .indicators
            .latest_indicators(trade.instrument_id, Timeframe::M15)?
            .map(|set| set.atr)
            .unwrap_or(DEFAULT_ATR);

        if let Some(new_stop) = trade.trailing_stop_candidate(price, atr) {
            self.trades.update(
                trade.id,
                TradePatch {
                    stop_loss: Some(new_stop),
                    ..TradePatch::default()
                },
            )?;
            return Ok(TradeSweep::Trailed);
        }

        Ok(TradeSweep::Held)
    }

    pub fn statistics(&self, user_id: i64) -> Result<TradingStatistics, FxforgeError> {
        let history = self.trades.history(user_id, HISTORY_LIMIT)?;
        Ok(TradingStatistics::compute(&history))
    }

    /// Account valuation: realized P&L from closed trades plus open trades
    /// marked to the latest 1-minute close.
    pub fn portfolio_value(&self, user_id: i64) -> Result<PortfolioValue, FxforgeError> {
        let history = self.trades.history(user_id, HISTORY_LIMIT)?;
        let realized: f64 = history
            .iter()
            .filter(|t| !t.status.is_open())
            .filter_map(|t| t.pnl)
            .sum();

        let mut unrealized = 0.0;
        for trade in self.trades.open_trades(user_id)? {
            if let Some(bar) = self.market.latest_bar(trade.instrument_id, Timeframe::M1)? {
                unrealized += trade.pnl_at(bar.close);
            }
        }

        Ok(PortfolioValue::from_pnl(realized, unrealized))
    }
}
