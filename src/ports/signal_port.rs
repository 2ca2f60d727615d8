//! Trading signal store and component signal source ports.

use crate::domain::error::FxforgeError;
use crate::domain::instrument::Timeframe;
use crate::domain::signal::{ComponentSignal, NewSignal, TradingSignal};

pub trait SignalStore: Send + Sync {
    fn active_signals(&self) -> Result<Vec<TradingSignal>, FxforgeError>;

    fn signals_for(&self, instrument_id: i64) -> Result<Vec<TradingSignal>, FxforgeError>;

    fn create(&self, signal: NewSignal) -> Result<TradingSignal, FxforgeError>;

    fn deactivate(&self, id: i64) -> Result<(), FxforgeError>;
}

/// What a component source is being asked about. Each source reads the part
/// it cares about: the technical source uses `(instrument_id, timeframe)`,
/// the fundamental source derives a base currency from `symbol`, sentiment
/// and positioning use the instrument alone.
#[derive(Debug, Clone)]
pub struct SignalScope {
    pub instrument_id: i64,
    pub symbol: String,
    pub timeframe: Timeframe,
}

/// One of the four opinion sources feeding fusion. The core is agnostic to
/// how the opinion was produced; it only sees direction and confidence.
pub trait ComponentSignalSource: Send + Sync {
    fn signal(&self, scope: &SignalScope) -> Result<ComponentSignal, FxforgeError>;
}
