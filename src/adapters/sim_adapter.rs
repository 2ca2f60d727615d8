//! Simulated market data feed and simulated opinion sources.
//!
//! The feed runs a trend-persistent random walk per instrument with mean
//! reverting volatility and occasional news shocks, then fans one movement
//! out to every timeframe with a range expansion. The drifting sources give
//! the fusion engine non-technical opinions to weigh so the whole pipeline
//! runs end to end without external data.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::domain::bar::Bar;
use crate::domain::error::FxforgeError;
use crate::domain::instrument::{Instrument, Timeframe, base_currency};
use crate::domain::signal::{ComponentSignal, Direction};
use crate::ports::market_port::{InstrumentStore, MarketDataFeed, MarketDataStore};
use crate::ports::signal_port::{ComponentSignalSource, SignalScope};

/// Fraction of the previous trend carried into the next tick.
const TREND_PERSISTENCE: f64 = 0.7;
/// Volatility mean-reversion factor toward the symbol's base volatility.
const VOLATILITY_REVERSION: f64 = 0.95;
/// Chance per tick of a news shock.
const NEWS_CHANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
struct PriceState {
    price: f64,
    trend: f64,
    volatility: f64,
}

struct Movement {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct MarketSimulator {
    instruments: Arc<dyn InstrumentStore>,
    market: Arc<dyn MarketDataStore>,
    states: Mutex<HashMap<i64, PriceState>>,
}

impl MarketSimulator {
    pub fn new(instruments: Arc<dyn InstrumentStore>, market: Arc<dyn MarketDataStore>) -> Self {
        MarketSimulator {
            instruments,
            market,
            states: Mutex::new(HashMap::new()),
        }
    }

    fn tick_instrument(
        &self,
        instrument: &Instrument,
        now: DateTime<Utc>,
    ) -> Result<usize, FxforgeError> {
        let movement = {
            let mut states = self
                .states
                .lock()
                .map_err(|e| FxforgeError::store("simulator_state", e))?;
            let state = states.entry(instrument.id).or_insert(PriceState {
                price: base_price(&instrument.symbol),
                trend: 0.0,
                volatility: base_volatility(&instrument.symbol),
            });
            step(state, &instrument.symbol)
        };

        let mut written = 0;
        for timeframe in Timeframe::ALL {
            let scaled = expand_range(&movement, timeframe);
            self.market.insert_bar(Bar {
                instrument_id: instrument.id,
                timeframe,
                timestamp: now,
                open: scaled.open,
                high: scaled.high,
                low: scaled.low,
                close: scaled.close,
                volume: scaled.volume,
            })?;
            written += 1;
        }
        Ok(written)
    }
}

impl MarketDataFeed for MarketSimulator {
    /// One tick for every instrument. A failure on one instrument is logged
    /// and the rest still get their bars.
    fn refresh(&self, now: DateTime<Utc>) -> Result<usize, FxforgeError> {
        let mut written = 0;
        for instrument in self.instruments.all()? {
            match self.tick_instrument(&instrument, now) {
                Ok(count) => written += count,
                Err(e) => {
                    warn!(symbol = %instrument.symbol, error = %e, "instrument tick failed")
                }
            }
        }
        Ok(written)
    }
}

/// Advance one price state and produce the base OHLCV movement. Mutates the
/// state in place so the next tick continues from this close.
fn step(state: &mut PriceState, symbol: &str) -> Movement {
    let mut rng = rand::thread_rng();

    let news_impact = if rng.gen_range(0.0..1.0) < NEWS_CHANCE {
        rng.gen_range(-1.0..1.0)
    } else {
        0.0
    };

    let mut trend = state.trend * TREND_PERSISTENCE + (rng.gen_range(0.0..1.0) - 0.5) * 0.2;
    trend += news_impact * 0.5;
    trend = trend.clamp(-1.0, 1.0);

    let base_vol = base_volatility(symbol);
    let mut volatility =
        state.volatility * VOLATILITY_REVERSION + base_vol * (1.0 - VOLATILITY_REVERSION);
    volatility += news_impact.abs() * base_vol * 0.5;

    let price_change = trend * volatility * 0.3 + (rng.gen_range(0.0..1.0) - 0.5) * volatility;

    let open = state.price;
    let close = open * (1.0 + price_change);

    let intrabar = volatility * 0.6;
    let high = open.max(close) * (1.0 + rng.gen_range(0.0..1.0) * intrabar);
    let low = open.min(close) * (1.0 - rng.gen_range(0.0..1.0) * intrabar);

    let volume_multiplier = 1.0 + price_change.abs() * 5.0 + news_impact.abs() * 2.0;
    let volume = base_volume(symbol) * volume_multiplier * (0.8 + rng.gen_range(0.0..1.0) * 0.4);

    state.price = close;
    state.trend = trend;
    state.volatility = volatility;

    Movement {
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Higher timeframes get a wider high/low range and more volume around the
/// same open/close.
fn expand_range(movement: &Movement, timeframe: Timeframe) -> Movement {
    let mult = range_multiplier(timeframe);
    let range = movement.high - movement.low;
    let center = (movement.high + movement.low) / 2.0;
    Movement {
        open: movement.open,
        high: center + range * mult / 2.0,
        low: center - range * mult / 2.0,
        close: movement.close,
        volume: movement.volume * mult,
    }
}

fn range_multiplier(timeframe: Timeframe) -> f64 {
    match timeframe {
        Timeframe::M1 => 0.3,
        Timeframe::M5 => 0.5,
        Timeframe::M15 => 0.7,
        Timeframe::H1 => 1.0,
        Timeframe::H4 => 1.5,
        Timeframe::D1 => 2.0,
    }
}

fn base_price(symbol: &str) -> f64 {
    match symbol {
        "EURUSD" => 1.0850,
        "GBPUSD" => 1.2650,
        "USDJPY" => 149.50,
        "AUDUSD" => 0.6750,
        "XAUUSD" => 2650.00,
        "XAGUSD" => 30.50,
        _ => 1.0000,
    }
}

fn base_volatility(symbol: &str) -> f64 {
    match symbol {
        "EURUSD" => 0.008,
        "GBPUSD" => 0.012,
        "USDJPY" => 0.010,
        "AUDUSD" => 0.015,
        "XAUUSD" => 0.020,
        "XAGUSD" => 0.035,
        _ => 0.010,
    }
}

fn base_volume(symbol: &str) -> f64 {
    match symbol {
        "EURUSD" => 5_000_000.0,
        "GBPUSD" => 3_000_000.0,
        "USDJPY" => 4_000_000.0,
        "AUDUSD" => 2_000_000.0,
        "XAUUSD" => 1_500_000.0,
        "XAGUSD" => 800_000.0,
        _ => 1_000_000.0,
    }
}

/// What a drifting source keys its state on.
#[derive(Debug, Clone, Copy)]
pub enum DriftKey {
    /// One opinion per instrument symbol (sentiment, positioning).
    Symbol,
    /// One opinion per base currency (fundamentals follow the currency).
    BaseCurrency,
}

/// A simulated opinion source: a slowly drifting signed score per key,
/// shocked a little each read and clamped to ±100.
pub struct DriftingSource {
    key: DriftKey,
    scores: Mutex<HashMap<String, f64>>,
}

/// Scores inside this band read as hold.
const DRIFT_HOLD_BAND: f64 = 20.0;

impl DriftingSource {
    pub fn new(key: DriftKey) -> Self {
        DriftingSource {
            key,
            scores: Mutex::new(HashMap::new()),
        }
    }

    fn key_for(&self, scope: &SignalScope) -> String {
        match self.key {
            DriftKey::Symbol => scope.symbol.clone(),
            DriftKey::BaseCurrency => base_currency(&scope.symbol).to_string(),
        }
    }
}

impl ComponentSignalSource for DriftingSource {
    fn signal(&self, scope: &SignalScope) -> Result<ComponentSignal, FxforgeError> {
        let key = self.key_for(scope);
        let mut scores = self
            .scores
            .lock()
            .map_err(|e| FxforgeError::store("drift_state", e))?;
        let score = scores.entry(key).or_insert(0.0);

        let mut rng = rand::thread_rng();
        *score = (*score * 0.8 + rng.gen_range(-30.0..30.0)).clamp(-100.0, 100.0);

        let direction = if *score > DRIFT_HOLD_BAND {
            Direction::Buy
        } else if *score < -DRIFT_HOLD_BAND {
            Direction::Sell
        } else {
            Direction::Hold
        };

        Ok(ComponentSignal {
            direction,
            confidence: score.abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_adapter::MemoryStore;
    use crate::domain::instrument::default_universe;
    use chrono::TimeZone;

    #[test]
    fn refresh_writes_one_bar_per_timeframe_per_instrument() {
        let store = Arc::new(MemoryStore::new());
        for (symbol, name, kind) in default_universe() {
            InstrumentStore::create(store.as_ref(), symbol, name, kind).unwrap();
        }
        let feed = MarketSimulator::new(store.clone(), store.clone());

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let written = feed.refresh(now).unwrap();
        assert_eq!(written, 6 * Timeframe::ALL.len());

        let bar = store.latest_bar(1, Timeframe::H1).unwrap().unwrap();
        assert!(bar.high >= bar.low);
        assert!(bar.volume > 0.0);
    }

    #[test]
    fn prices_continue_between_ticks() {
        let store = Arc::new(MemoryStore::new());
        InstrumentStore::create(
            store.as_ref(),
            "EURUSD",
            "Euro / US Dollar",
            crate::domain::instrument::InstrumentKind::Forex,
        )
        .unwrap();
        let feed = MarketSimulator::new(store.clone(), store.clone());

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 2, 0).unwrap();
        feed.refresh(t0).unwrap();
        let first = store.latest_bar(1, Timeframe::H1).unwrap().unwrap();
        feed.refresh(t1).unwrap();
        let second = store.latest_bar(1, Timeframe::H1).unwrap().unwrap();

        // Next bar opens where the previous one closed.
        assert!((second.open - first.close).abs() < 1e-12);
    }

    #[test]
    fn bars_stay_near_base_price_over_a_few_ticks() {
        let store = Arc::new(MemoryStore::new());
        InstrumentStore::create(
            store.as_ref(),
            "EURUSD",
            "Euro / US Dollar",
            crate::domain::instrument::InstrumentKind::Forex,
        )
        .unwrap();
        let feed = MarketSimulator::new(store.clone(), store.clone());

        for minute in 0..20 {
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(minute);
            feed.refresh(now).unwrap();
        }
        let bar = store.latest_bar(1, Timeframe::M1).unwrap().unwrap();
        // Volatility is under 2% per tick; twenty ticks cannot stray far.
        assert!(bar.close > 0.5 && bar.close < 2.0);
    }

    struct FailingMarket {
        inner: Arc<MemoryStore>,
        failing_instrument: i64,
    }

    impl MarketDataStore for FailingMarket {
        fn latest_bar(
            &self,
            instrument_id: i64,
            timeframe: Timeframe,
        ) -> Result<Option<Bar>, FxforgeError> {
            self.inner.latest_bar(instrument_id, timeframe)
        }

        fn bars_in_range(
            &self,
            instrument_id: i64,
            timeframe: Timeframe,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Bar>, FxforgeError> {
            self.inner.bars_in_range(instrument_id, timeframe, from, to)
        }

        fn insert_bar(&self, bar: Bar) -> Result<(), FxforgeError> {
            if bar.instrument_id == self.failing_instrument {
                return Err(FxforgeError::store("insert_bar", "synthetic outage"));
            }
            self.inner.insert_bar(bar)
        }
    }

    #[test]
    fn one_failing_instrument_does_not_block_the_refresh() {
        let store = Arc::new(MemoryStore::new());
        InstrumentStore::create(
            store.as_ref(),
            "EURUSD",
            "Euro / US Dollar",
            crate::domain::instrument::InstrumentKind::Forex,
        )
        .unwrap();
        InstrumentStore::create(
            store.as_ref(),
            "GBPUSD",
            "British Pound / US Dollar",
            crate::domain::instrument::InstrumentKind::Forex,
        )
        .unwrap();

        let market = Arc::new(FailingMarket {
            inner: store.clone(),
            failing_instrument: 1,
        });
        let feed = MarketSimulator::new(store.clone(), market);

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let written = feed.refresh(now).unwrap();
        // Only the healthy instrument gets bars; the sweep still completes.
        assert_eq!(written, Timeframe::ALL.len());
        assert!(store.latest_bar(1, Timeframe::H1).unwrap().is_none());
        assert!(store.latest_bar(2, Timeframe::H1).unwrap().is_some());
    }

    #[test]
    fn drifting_source_stays_in_bounds() {
        let source = DriftingSource::new(DriftKey::Symbol);
        let scope = SignalScope {
            instrument_id: 1,
            symbol: "EURUSD".to_string(),
            timeframe: Timeframe::H1,
        };
        for _ in 0..200 {
            let opinion = source.signal(&scope).unwrap();
            assert!((0.0..=100.0).contains(&opinion.confidence));
            if opinion.direction == Direction::Hold {
                assert!(opinion.confidence <= DRIFT_HOLD_BAND);
            }
        }
    }

    #[test]
    fn currency_keyed_source_shares_state_across_metals() {
        let source = DriftingSource::new(DriftKey::BaseCurrency);
        let gold = SignalScope {
            instrument_id: 5,
            symbol: "XAUUSD".to_string(),
            timeframe: Timeframe::H1,
        };
        assert_eq!(source.key_for(&gold), "USD");
    }
}
