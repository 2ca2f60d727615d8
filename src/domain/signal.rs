//! Signal types and the fusion math that combines component opinions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::instrument::Timeframe;

/// Fusion weights for the four component sources. Sum to 1.0.
pub const WEIGHT_TECHNICAL: f64 = 0.40;
pub const WEIGHT_FUNDAMENTAL: f64 = 0.25;
pub const WEIGHT_SENTIMENT: f64 = 0.20;
pub const WEIGHT_COT: f64 = 0.15;

/// Combined scores outside ±this classify as buy/sell; inside is hold.
pub const CLASSIFY_THRESHOLD: f64 = 30.0;

/// Signals below this confidence are silently not emitted.
pub const CONFIDENCE_FLOOR: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Hold => "hold",
        }
    }

    /// Signed unit score: buy = +1, sell = -1, hold = 0.
    pub fn score(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
            Direction::Hold => 0.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two-field opinion contract every component source produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentSignal {
    pub direction: Direction,
    /// In [0, 100].
    pub confidence: f64,
}

impl ComponentSignal {
    pub fn hold() -> Self {
        ComponentSignal {
            direction: Direction::Hold,
            confidence: 0.0,
        }
    }

    /// Signed score: direction × confidence, in [-100, 100].
    pub fn score(&self) -> f64 {
        self.direction.score() * self.confidence
    }
}

/// Signed per-factor scores ready for weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    pub cot: f64,
}

impl ComponentScores {
    /// Weighted combination; pure and deterministic.
    pub fn combined(&self) -> f64 {
        self.technical * WEIGHT_TECHNICAL
            + self.fundamental * WEIGHT_FUNDAMENTAL
            + self.sentiment * WEIGHT_SENTIMENT
            + self.cot * WEIGHT_COT
    }
}

/// Map a combined score to a trade direction.
pub fn classify(combined: f64) -> Direction {
    if combined > CLASSIFY_THRESHOLD {
        Direction::Buy
    } else if combined < -CLASSIFY_THRESHOLD {
        Direction::Sell
    } else {
        Direction::Hold
    }
}

/// Entry/target/stop prices for a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevels {
    pub entry: f64,
    pub target: f64,
    pub stop: f64,
}

/// Derive price levels from the current price, ATR, and confidence.
///
/// ATR enters as a fraction of the current price; higher confidence widens
/// the target (`atr_multiplier = 2 + confidence/100`) while the stop stays at
/// 1.5 ATR. Buy entries pay a 0.1% premium, sell entries a 0.1% discount.
pub fn price_levels(current: f64, direction: Direction, atr: f64, confidence: f64) -> PriceLevels {
    let atr_multiplier = 2.0 + confidence / 100.0;
    match direction {
        Direction::Buy => PriceLevels {
            entry: current * 1.001,
            target: current * (1.0 + atr * atr_multiplier / current),
            stop: current * (1.0 - atr * 1.5 / current),
        },
        Direction::Sell => PriceLevels {
            entry: current * 0.999,
            target: current * (1.0 - atr * atr_multiplier / current),
            stop: current * (1.0 + atr * 1.5 / current),
        },
        Direction::Hold => PriceLevels {
            entry: current,
            target: current,
            stop: current,
        },
    }
}

/// A fused, confidence-scored trading signal. Immutable once created except
/// for the `is_active` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: i64,
    pub instrument_id: i64,
    pub timeframe: Timeframe,
    pub signal_type: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub sentiment_score: f64,
    pub cot_score: f64,
    pub combined_score: f64,
    pub is_active: bool,
    pub timestamp: DateTime<Utc>,
}

/// Signal fields as handed to the store; the store assigns `id` and sets
/// `is_active = true`.
#[derive(Debug, Clone)]
pub struct NewSignal {
    pub instrument_id: i64,
    pub timeframe: Timeframe,
    pub signal_type: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss: f64,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub sentiment_score: f64,
    pub cot_score: f64,
    pub combined_score: f64,
    pub timestamp: DateTime<Utc>,
}
