//! Event sink port: fire-and-forget notifications to external subscribers.

use serde::Serialize;

use crate::domain::error::FxforgeError;
use crate::domain::signal::TradingSignal;

/// Events the core broadcasts. Tagged so subscribers can route on `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BotEvent {
    NewSignals(Vec<TradingSignal>),
}

pub trait EventSink: Send + Sync {
    /// Best-effort delivery; a sink with no subscribers is not an error.
    fn publish(&self, event: &BotEvent) -> Result<(), FxforgeError>;
}
