//! OHLCV bar representation.

use chrono::{DateTime, Utc};

use super::instrument::Timeframe;

/// One price bar for an `(instrument, timeframe)` pair. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Bar {
    pub instrument_id: i64,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}
