//! Instruments, timeframes, and the default trading universe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bar aggregation interval. Closed set; anything else is not a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// Timeframes the indicator refresh pass covers.
    pub const ANALYSIS: [Timeframe; 4] =
        [Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1];

    /// Timeframes signal fusion generates signals for.
    pub const SIGNAL: [Timeframe; 3] = [Timeframe::H1, Timeframe::H4, Timeframe::D1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Timeframe> {
        match s {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    Forex,
    Metal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub kind: InstrumentKind,
}

/// Base currency used to scope fundamental analysis.
/// Metals are priced in USD; forex pairs use their first three characters.
pub fn base_currency(symbol: &str) -> &str {
    if symbol.starts_with("XAU") || symbol.starts_with("XAG") {
        return "USD";
    }
    if symbol.len() >= 3 { &symbol[..3] } else { symbol }
}

/// Kind inferred from the symbol. Metals are the XAU/XAG pairs.
pub fn kind_for_symbol(symbol: &str) -> InstrumentKind {
    if symbol.starts_with("XAU") || symbol.starts_with("XAG") {
        InstrumentKind::Metal
    } else {
        InstrumentKind::Forex
    }
}

/// The fixed universe the bot trades when no instrument list is configured.
pub fn default_universe() -> Vec<(&'static str, &'static str, InstrumentKind)> {
    vec![
        ("EURUSD", "Euro/US Dollar", InstrumentKind::Forex),
        ("GBPUSD", "British Pound/US Dollar", InstrumentKind::Forex),
        ("USDJPY", "US Dollar/Japanese Yen", InstrumentKind::Forex),
        ("AUDUSD", "Australian Dollar/US Dollar", InstrumentKind::Forex),
        ("XAUUSD", "Gold/US Dollar", InstrumentKind::Metal),
        ("XAGUSD", "Silver/US Dollar", InstrumentKind::Metal),
    ]
}
