#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use fxforge::adapters::memory_adapter::MemoryStore;
use fxforge::domain::bar::Bar;
use fxforge::domain::error::FxforgeError;
use fxforge::domain::instrument::{Instrument, InstrumentKind, Timeframe};
use fxforge::domain::signal::{ComponentSignal, Direction};
use fxforge::ports::market_port::{InstrumentStore, MarketDataStore};
use fxforge::ports::signal_port::{ComponentSignalSource, SignalScope};

/// A component source that always answers the same opinion.
pub struct StaticSource {
    pub direction: Direction,
    pub confidence: f64,
}

impl StaticSource {
    pub fn new(direction: Direction, confidence: f64) -> Arc<Self> {
        Arc::new(StaticSource {
            direction,
            confidence,
        })
    }

    pub fn hold() -> Arc<Self> {
        StaticSource::new(Direction::Hold, 0.0)
    }
}

impl ComponentSignalSource for StaticSource {
    fn signal(&self, _scope: &SignalScope) -> Result<ComponentSignal, FxforgeError> {
        Ok(ComponentSignal {
            direction: self.direction,
            confidence: self.confidence,
        })
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn store_with_eurusd() -> (Arc<MemoryStore>, Instrument) {
    let store = Arc::new(MemoryStore::new());
    let instrument = store
        .create("EURUSD", "Euro/US Dollar", InstrumentKind::Forex)
        .unwrap();
    (store, instrument)
}

pub fn bar(instrument_id: i64, timeframe: Timeframe, at: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        instrument_id,
        timeframe,
        timestamp: at,
        open: close,
        high: close + 0.0010,
        low: close - 0.0010,
        close,
        volume: 1_000.0,
    }
}

/// Seed `count` hourly bars ending at `t0 + count` hours with the given
/// closes repeated as needed.
pub fn seed_bars(
    store: &MemoryStore,
    instrument_id: i64,
    timeframe: Timeframe,
    closes: &[f64],
) {
    for (i, &close) in closes.iter().enumerate() {
        let at = t0() + chrono::Duration::hours(i as i64);
        store
            .insert_bar(bar(instrument_id, timeframe, at, close))
            .unwrap();
    }
}

/// A gently oscillating close series long enough for every indicator.
pub fn trending_closes(len: usize, base: f64) -> Vec<f64> {
    (0..len)
        .map(|i| base + (i % 9) as f64 * 0.0010 + i as f64 * 0.0001)
        .collect()
}
