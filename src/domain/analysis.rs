//! Indicator refresh pass and the technical component source.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::indicator::{self, IndicatorSet};
use super::instrument::Timeframe;
use super::signal::{ComponentSignal, Direction};
use crate::domain::error::FxforgeError;
use crate::ports::market_port::{IndicatorStore, MarketDataStore};
use crate::ports::signal_port::{ComponentSignalSource, SignalScope};

/// How far back the refresh pass looks for bars.
const LOOKBACK_DAYS: i64 = 50;

/// Recomputes and persists indicator sets for one instrument across the
/// analysis timeframes. Timeframes with fewer than the minimum bar count are
/// skipped silently.
pub struct IndicatorAnalyzer {
    market: Arc<dyn MarketDataStore>,
    indicators: Arc<dyn IndicatorStore>,
}

impl IndicatorAnalyzer {
    pub fn new(market: Arc<dyn MarketDataStore>, indicators: Arc<dyn IndicatorStore>) -> Self {
        IndicatorAnalyzer { market, indicators }
    }

    /// Returns the number of indicator sets written.
    pub fn analyze_instrument(
        &self,
        instrument_id: i64,
        now: DateTime<Utc>,
    ) -> Result<usize, FxforgeError> {
        let from = now - Duration::days(LOOKBACK_DAYS);
        let mut written = 0;

        for timeframe in Timeframe::ANALYSIS {
            let bars = self
                .market
                .bars_in_range(instrument_id, timeframe, from, now)?;
            if let Some(set) = indicator::compute(&bars) {
                self.indicators.save(set)?;
                written += 1;
            }
        }

        Ok(written)
    }
}

/// Vote weights for the three technical sub-signals.
const RSI_WEIGHT: f64 = 2.0;
const MACD_WEIGHT: f64 = 1.5;
const MA_CROSS_WEIGHT: f64 = 1.0;

/// Derive a direction/confidence opinion from one indicator set.
///
/// RSI votes only at extremes (oversold < 30 buys, overbought > 70 sells);
/// MACD-above-signal and the 50/200 MA cross always vote. The normalized
/// score maps to buy/sell outside ±0.3.
pub fn technical_opinion(indicators: &IndicatorSet) -> ComponentSignal {
    let mut score = 0.0;
    let mut total_weight = 0.0;

    if indicators.rsi < 30.0 {
        score += RSI_WEIGHT;
    } else if indicators.rsi > 70.0 {
        score -= RSI_WEIGHT;
    }
    total_weight += RSI_WEIGHT;

    if indicators.macd > indicators.macd_signal {
        score += MACD_WEIGHT;
    } else {
        score -= MACD_WEIGHT;
    }
    total_weight += MACD_WEIGHT;

    if indicators.ma50 > indicators.ma200 {
        score += MA_CROSS_WEIGHT;
    } else {
        score -= MA_CROSS_WEIGHT;
    }
    total_weight += MA_CROSS_WEIGHT;

    let normalized = score / total_weight;
    let confidence = (normalized.abs() * 100.0).min(100.0);

    let direction = if normalized > 0.3 {
        Direction::Buy
    } else if normalized < -0.3 {
        Direction::Sell
    } else {
        Direction::Hold
    };

    ComponentSignal {
        direction,
        confidence,
    }
}

/// The technical factor as a component source: reads the latest persisted
/// indicator set for the scope's `(instrument, timeframe)`. No indicators
/// yet means a zero-confidence hold, not an error.
pub struct TechnicalSource {
    indicators: Arc<dyn IndicatorStore>,
}

impl TechnicalSource {
    pub fn new(indicators: Arc<dyn IndicatorStore>) -> Self {
        TechnicalSource { indicators }
    }
}

impl ComponentSignalSource for TechnicalSource {
    fn signal(&self, scope: &SignalScope) -> Result<ComponentSignal, FxforgeError> {
        let latest = self
            .indicators
            .latest_indicators(scope.instrument_id, scope.timeframe)?;
        Ok(match latest {
            Some(set) => technical_opinion(&set),
            None => ComponentSignal::hold(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn neutral_set() -> IndicatorSet {
        IndicatorSet {
            instrument_id: 1,
            timeframe: Timeframe::H1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            rsi: 50.0,
            macd: 0.001,
            macd_signal: 0.0009,
            ma50: 1.10,
            ma200: 1.09,
            bollinger_upper: 1.12,
            bollinger_lower: 1.08,
            atr: 0.001,
            support_level: 1.08,
            resistance_level: 1.12,
        }
    }

    #[test]
    fn bullish_alignment_votes_buy() {
        let mut set = neutral_set();
        set.rsi = 25.0;
        // oversold + macd above signal + golden cross: (2 + 1.5 + 1) / 4.5 = 1
        let opinion = technical_opinion(&set);
        assert_eq!(opinion.direction, Direction::Buy);
        assert!((opinion.confidence - 100.0).abs() < 1e-9);
    }

    #[test]
    fn bearish_alignment_votes_sell() {
        let mut set = neutral_set();
        set.rsi = 75.0;
        set.macd = 0.0009;
        set.macd_signal = 0.001;
        set.ma50 = 1.08;
        set.ma200 = 1.09;
        let opinion = technical_opinion(&set);
        assert_eq!(opinion.direction, Direction::Sell);
        assert!((opinion.confidence - 100.0).abs() < 1e-9);
    }

    #[test]
    fn mixed_votes_hold() {
        let mut set = neutral_set();
        // RSI neutral, macd bullish (+1.5), cross bearish (-1)
        set.ma50 = 1.08;
        set.ma200 = 1.09;
        let opinion = technical_opinion(&set);
        // (1.5 - 1) / 4.5 ≈ 0.111 → inside ±0.3
        assert_eq!(opinion.direction, Direction::Hold);
        assert!(opinion.confidence < 30.0);
    }

    #[test]
    fn neutral_rsi_does_not_vote() {
        let set = neutral_set();
        // macd bullish + golden cross = 2.5 / 4.5 ≈ 0.556
        let opinion = technical_opinion(&set);
        assert_eq!(opinion.direction, Direction::Buy);
        assert!((opinion.confidence - 2.5 / 4.5 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_always_in_range() {
        let mut set = neutral_set();
        for rsi in [0.0, 29.9, 30.0, 50.0, 70.0, 70.1, 100.0] {
            set.rsi = rsi;
            let opinion = technical_opinion(&set);
            assert!((0.0..=100.0).contains(&opinion.confidence));
        }
    }
}
