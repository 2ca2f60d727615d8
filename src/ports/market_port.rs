//! Market data, indicator, and instrument store ports.

use chrono::{DateTime, Utc};

use crate::domain::bar::Bar;
use crate::domain::error::FxforgeError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::instrument::{Instrument, InstrumentKind, Timeframe};

pub trait MarketDataStore: Send + Sync {
    fn latest_bar(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
    ) -> Result<Option<Bar>, FxforgeError>;

    fn bars_in_range(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FxforgeError>;

    fn insert_bar(&self, bar: Bar) -> Result<(), FxforgeError>;
}

pub trait IndicatorStore: Send + Sync {
    fn latest_indicators(
        &self,
        instrument_id: i64,
        timeframe: Timeframe,
    ) -> Result<Option<IndicatorSet>, FxforgeError>;

    fn save(&self, indicators: IndicatorSet) -> Result<(), FxforgeError>;
}

pub trait InstrumentStore: Send + Sync {
    fn all(&self) -> Result<Vec<Instrument>, FxforgeError>;

    fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>, FxforgeError>;

    fn create(
        &self,
        symbol: &str,
        name: &str,
        kind: InstrumentKind,
    ) -> Result<Instrument, FxforgeError>;
}

/// A producer that ingests or regenerates bars for the whole universe.
/// Returns the number of bars written. The orchestrator's data-refresh cycle
/// is the only caller.
pub trait MarketDataFeed: Send + Sync {
    fn refresh(&self, now: DateTime<Utc>) -> Result<usize, FxforgeError>;
}
