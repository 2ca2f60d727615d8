//! In-memory store adapter.
//!
//! Backs every store port with mutex-guarded maps. This is the storage the
//! simulation runs against; the trait seams are where a SQL adapter would
//! slot in.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::bar::Bar;
use crate::domain::error::FxforgeError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::instrument::{Instrument, InstrumentKind, Timeframe};
use crate::domain::risk::RiskProfile;
use crate::domain::signal::{NewSignal, TradingSignal};
use crate::domain::trade::{NewTrade, PaperTrade, TradePatch, TradeStatus};
use crate::ports::market_port::{IndicatorStore, InstrumentStore, MarketDataStore};
use crate::ports::signal_port::SignalStore;
use crate::ports::trade_port::{RiskProfileStore, TradeStore};

#[derive(Default)]
struct Inner {
    instruments: Vec<Instrument>,
    bars: HashMap<(i64, Timeframe), Vec<Bar>>,
    indicators: HashMap<(i64, Timeframe), IndicatorSet>,
    signals: Vec<TradingSignal>,
    trades: Vec<PaperTrade>,
    profiles: HashMap<i64, RiskProfile>,
    next_instrument_id: i64,
    next_signal_id: i64,
    next_trade_id: i64,
}

/// One shared store for the whole process; every port trait is implemented
/// on it so the wiring can hand out `Arc<MemoryStore>` clones.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Mutex::new(Inner {
                next_instrument_id: 1,
                next_signal_id: 1,
                next_trade_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self, operation: &str) -> Result<MutexGuard<'_, Inner>, FxforgeError> {
        self.inner
            .lock()
            .map_err(|e| FxforgeError::store(operation, e))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MarketDataStore for MemoryStore {
    fn latest_bar(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
    ) -> Result<Option<Bar>, FxforgeError> {
        let inner = self.lock("latest_bar")?;
        Ok(inner
            .bars
            .get(&(instrument_id, timeframe))
            .and_then(|bars| bars.last())
            .cloned())
    }

    fn bars_in_range(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FxforgeError> {
        let inner = self.lock("bars_in_range")?;
        Ok(inner
            .bars
            .get(&(instrument_id, timeframe))
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= from && b.timestamp <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn insert_bar(&self, bar: Bar) -> Result<(), FxforgeError> {
        let mut inner = self.lock("insert_bar")?;
        let series = inner
            .bars
            .entry((bar.instrument_id, bar.timeframe))
            .or_default();
        // Bars arrive in timestamp order from the feed; a late bar is
        // re-sorted into place rather than rejected.
        let out_of_order = series
            .last()
            .is_some_and(|last| last.timestamp > bar.timestamp);
        series.push(bar);
        if out_of_order {
            series.sort_by_key(|b| b.timestamp);
        }
        Ok(())
    }
}

impl IndicatorStore for MemoryStore {
    fn latest_indicators(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
    ) -> Result<Option<IndicatorSet>, FxforgeError> {
        let inner = self.lock("latest_indicators")?;
        Ok(inner.indicators.get(&(instrument_id, timeframe)).cloned())
    }

    fn save(&self, indicators: IndicatorSet) -> Result<(), FxforgeError> {
        let mut inner = self.lock("save_indicators")?;
        inner
            .indicators
            .insert((indicators.instrument_id, indicators.timeframe), indicators);
        Ok(())
    }
}

impl InstrumentStore for MemoryStore {
    fn all(&self) -> Result<Vec<Instrument>, FxforgeError> {
        let inner = self.lock("all_instruments")?;
        Ok(inner.instruments.clone())
    }

    fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>, FxforgeError> {
        let inner = self.lock("find_by_symbol")?;
        Ok(inner
            .instruments
            .iter()
            .find(|i| i.symbol == symbol)
            .cloned())
    }

    fn create(
        &self,
        symbol: &str,
        name: &str,
        kind: InstrumentKind,
    ) -> Result<Instrument, FxforgeError> {
        let mut inner = self.lock("create_instrument")?;
        let instrument = Instrument {
            id: inner.next_instrument_id,
            symbol: symbol.to_string(),
            name: name.to_string(),
            kind,
        };
        inner.next_instrument_id += 1;
        inner.instruments.push(instrument.clone());
        Ok(instrument)
    }
}

impl SignalStore for MemoryStore {
    fn active_signals(&self) -> Result<Vec<TradingSignal>, FxforgeError> {
        let inner = self.lock("active_signals")?;
        Ok(inner
            .signals
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    fn signals_for(&self, instrument_id: i64) -> Result<Vec<TradingSignal>, FxforgeError> {
        let inner = self.lock("signals_for")?;
        Ok(inner
            .signals
            .iter()
            .filter(|s| s.instrument_id == instrument_id)
            .cloned()
            .collect())
    }

    fn create(&self, signal: NewSignal) -> Result<TradingSignal, FxforgeError> {
        let mut inner = self.lock("create_signal")?;
        let stored = TradingSignal {
            id: inner.next_signal_id,
            instrument_id: signal.instrument_id,
            timeframe: signal.timeframe,
            signal_type: signal.signal_type,
            confidence: signal.confidence,
            entry_price: signal.entry_price,
            target_price: signal.target_price,
            stop_loss: signal.stop_loss,
            technical_score: signal.technical_score,
            fundamental_score: signal.fundamental_score,
            sentiment_score: signal.sentiment_score,
            cot_score: signal.cot_score,
            combined_score: signal.combined_score,
            is_active: true,
            timestamp: signal.timestamp,
        };
        inner.next_signal_id += 1;
        inner.signals.push(stored.clone());
        Ok(stored)
    }

    fn deactivate(&self, id: i64) -> Result<(), FxforgeError> {
        let mut inner = self.lock("deactivate_signal")?;
        if let Some(signal) = inner.signals.iter_mut().find(|s| s.id == id) {
            signal.is_active = false;
        }
        Ok(())
    }
}

impl TradeStore for MemoryStore {
    fn open_trades(&self, user_id: i64) -> Result<Vec<PaperTrade>, FxforgeError> {
        let inner = self.lock("open_trades")?;
        Ok(inner
            .trades
            .iter()
            .filter(|t| t.user_id == user_id && t.status == TradeStatus::Open)
            .cloned()
            .collect())
    }

    fn history(&self, user_id: i64, limit: usize) -> Result<Vec<PaperTrade>, FxforgeError> {
        let inner = self.lock("trade_history")?;
        let mut trades: Vec<PaperTrade> = inner
            .trades
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.opened_at.cmp(&a.opened_at).then(b.id.cmp(&a.id)));
        trades.truncate(limit);
        Ok(trades)
    }

    fn create(&self, trade: NewTrade) -> Result<PaperTrade, FxforgeError> {
        let mut inner = self.lock("create_trade")?;
        let stored = PaperTrade {
            id: inner.next_trade_id,
            user_id: trade.user_id,
            instrument_id: trade.instrument_id,
            signal_id: trade.signal_id,
            trade_type: trade.trade_type,
            position_size: trade.position_size,
            entry_price: trade.entry_price,
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            exit_price: None,
            pnl: None,
            status: TradeStatus::Open,
            opened_at: trade.opened_at,
            closed_at: None,
        };
        inner.next_trade_id += 1;
        inner.trades.push(stored.clone());
        Ok(stored)
    }

    fn update(&self, id: i64, patch: TradePatch) -> Result<PaperTrade, FxforgeError> {
        let mut inner = self.lock("update_trade")?;
        let trade = inner
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(FxforgeError::TradeNotFound { id })?;

        if let Some(stop_loss) = patch.stop_loss {
            trade.stop_loss = Some(stop_loss);
        }
        if let Some(exit_price) = patch.exit_price {
            trade.exit_price = Some(exit_price);
        }
        if let Some(pnl) = patch.pnl {
            trade.pnl = Some(pnl);
        }
        if let Some(status) = patch.status {
            trade.status = status;
        }
        if let Some(closed_at) = patch.closed_at {
            trade.closed_at = Some(closed_at);
        }
        Ok(trade.clone())
    }
}

impl RiskProfileStore for MemoryStore {
    fn get(&self, user_id: i64) -> Result<Option<RiskProfile>, FxforgeError> {
        let inner = self.lock("get_risk_profile")?;
        Ok(inner.profiles.get(&user_id).cloned())
    }

    fn upsert(&self, user_id: i64, profile: RiskProfile) -> Result<(), FxforgeError> {
        let mut inner = self.lock("upsert_risk_profile")?;
        inner.profiles.insert(user_id, profile);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar_at(instrument_id: i64, hour: u32, close: f64) -> Bar {
        Bar {
            instrument_id,
            timeframe: Timeframe::H1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn latest_bar_is_most_recent() {
        let store = MemoryStore::new();
        store.insert_bar(bar_at(1, 1, 1.10)).unwrap();
        store.insert_bar(bar_at(1, 2, 1.11)).unwrap();
        let latest = store.latest_bar(1, Timeframe::H1).unwrap().unwrap();
        assert_eq!(latest.close, 1.11);
    }

    #[test]
    fn out_of_order_bar_is_resorted() {
        let store = MemoryStore::new();
        store.insert_bar(bar_at(1, 3, 1.12)).unwrap();
        store.insert_bar(bar_at(1, 1, 1.10)).unwrap();
        let latest = store.latest_bar(1, Timeframe::H1).unwrap().unwrap();
        assert_eq!(latest.close, 1.12);
    }

    #[test]
    fn bars_in_range_is_inclusive() {
        let store = MemoryStore::new();
        for hour in 1..=4 {
            store.insert_bar(bar_at(1, hour, 1.10)).unwrap();
        }
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        let bars = store.bars_in_range(1, Timeframe::H1, from, to).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn bars_are_segregated_by_timeframe() {
        let store = MemoryStore::new();
        store.insert_bar(bar_at(1, 1, 1.10)).unwrap();
        assert!(store.latest_bar(1, Timeframe::M1).unwrap().is_none());
    }

    #[test]
    fn instrument_ids_are_sequential() {
        let store = MemoryStore::new();
        let first = InstrumentStore::create(&store, "EURUSD", "Euro / US Dollar", InstrumentKind::Forex);
        let second = InstrumentStore::create(&store, "XAUUSD", "Gold / US Dollar", InstrumentKind::Metal);
        assert_eq!(first.unwrap().id, 1);
        assert_eq!(second.unwrap().id, 2);
        assert!(store.find_by_symbol("EURUSD").unwrap().is_some());
        assert!(store.find_by_symbol("GBPUSD").unwrap().is_none());
    }

    #[test]
    fn deactivated_signals_leave_active_view() {
        let store = MemoryStore::new();
        let signal = SignalStore::create(
            &store,
            NewSignal {
                instrument_id: 1,
                timeframe: Timeframe::H1,
                signal_type: crate::domain::signal::Direction::Buy,
                confidence: 60.0,
                entry_price: 1.1,
                target_price: 1.11,
                stop_loss: 1.09,
                technical_score: 50.0,
                fundamental_score: 50.0,
                sentiment_score: 50.0,
                cot_score: 50.0,
                combined_score: 50.0,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
            .unwrap();
        assert!(signal.is_active);
        assert_eq!(SignalStore::active_signals(&store).unwrap().len(), 1);

        store.deactivate(signal.id).unwrap();
        assert!(SignalStore::active_signals(&store).unwrap().is_empty());
        // History still holds the signal.
        assert_eq!(store.signals_for(1).unwrap().len(), 1);
    }

    #[test]
    fn trade_history_is_newest_first_and_capped() {
        let store = MemoryStore::new();
        for hour in 0..5 {
            TradeStore::create(
                &store,
                NewTrade {
                    user_id: 1,
                    instrument_id: 1,
                    signal_id: None,
                    trade_type: crate::domain::trade::TradeType::Buy,
                    position_size: 0.01,
                    entry_price: 1.1,
                    stop_loss: None,
                    take_profit: None,
                    opened_at: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
                })
                .unwrap();
        }
        let history = store.history(1, 3).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].opened_at > history[1].opened_at);
    }

    #[test]
    fn trade_patch_applies_only_set_fields() {
        let store = MemoryStore::new();
        let trade = TradeStore::create(
            &store,
            NewTrade {
                user_id: 1,
                instrument_id: 1,
                signal_id: None,
                trade_type: crate::domain::trade::TradeType::Buy,
                position_size: 0.01,
                entry_price: 1.1,
                stop_loss: Some(1.09),
                take_profit: Some(1.12),
                opened_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            })
            .unwrap();

        let updated = store
            .update(
                trade.id,
                TradePatch {
                    stop_loss: Some(1.095),
                    ..TradePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.stop_loss, Some(1.095));
        assert_eq!(updated.take_profit, Some(1.12));
        assert_eq!(updated.status, TradeStatus::Open);
    }

    #[test]
    fn updating_missing_trade_is_an_error() {
        let store = MemoryStore::new();
        let err = store.update(99, TradePatch::default()).unwrap_err();
        assert!(matches!(err, FxforgeError::TradeNotFound { id: 99 }));
    }

    #[test]
    fn risk_profile_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(1).unwrap().is_none());
        store.upsert(1, RiskProfile::default()).unwrap();
        assert_eq!(store.get(1).unwrap(), Some(RiskProfile::default()));
    }
}
