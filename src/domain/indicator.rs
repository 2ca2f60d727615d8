//! Technical indicator computation.
//!
//! Everything here is a pure function over an ordered bar history. The full
//! indicator set is recomputed wholesale on every call; nothing is carried
//! between calls.
//!
//! RSI uses Wilder's smoothing: the first average gain/loss is a simple mean
//! over the first `period` deltas, then `avg = (avg*(n-1) + current) / n`
//! rolled forward. `avg_loss == 0` pins RSI at 100.
//!
//! The MACD signal line is `macd * 0.9`, not an EMA(9) of the MACD series.
//! The technical vote in `analysis` is calibrated against this exact line;
//! changing it to a conventional signal line changes every downstream score.

use chrono::{DateTime, Utc};

use super::bar::Bar;
use super::instrument::Timeframe;

/// Minimum bar history required to produce an indicator set.
pub const MIN_BARS: usize = 20;

/// Derived indicator snapshot for one `(instrument, timeframe)` at a point in
/// time. Always written whole, never partially updated.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub instrument_id: i64,
    pub timeframe: Timeframe,
    pub timestamp: DateTime<Utc>,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub ma50: f64,
    pub ma200: f64,
    pub bollinger_upper: f64,
    pub bollinger_lower: f64,
    pub atr: f64,
    pub support_level: f64,
    pub resistance_level: f64,
}

/// Compute the full indicator set from an ordered bar history.
///
/// Returns `None` when fewer than [`MIN_BARS`] bars are available — callers
/// skip the computation for this cycle, it is not an error. The result is
/// stamped with the last bar's timestamp so the engine never reads the clock.
pub fn compute(bars: &[Bar]) -> Option<IndicatorSet> {
    if bars.len() < MIN_BARS {
        return None;
    }
    let last = bars.last()?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let (macd, macd_signal) = macd(&closes);
    let (bollinger_upper, bollinger_lower) = bollinger(&closes, 20, 2.0);
    let (support_level, resistance_level) = support_resistance(bars);

    Some(IndicatorSet {
        instrument_id: last.instrument_id,
        timeframe: last.timeframe,
        timestamp: last.timestamp,
        rsi: rsi(&closes, 14),
        macd,
        macd_signal,
        ma50: sma(&closes, 50),
        ma200: sma(&closes, 200),
        bollinger_upper,
        bollinger_lower,
        atr: atr(bars, 14),
        support_level,
        resistance_level,
    })
}

/// Wilder-smoothed RSI over closing prices. Neutral 50 when there are not
/// enough closes for even one full period of deltas.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = if change > 0.0 { change } else { 0.0 };
        let loss = if change < 0.0 { -change } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// EMA seeded with the first close: `ema = close*k + ema*(1-k)`, `k = 2/(n+1)`.
pub fn ema(closes: &[f64], period: usize) -> f64 {
    let Some(&first) = closes.first() else {
        return 0.0;
    };
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = first;
    for &close in &closes[1..] {
        ema = close * k + ema * (1.0 - k);
    }
    ema
}

/// Arithmetic mean of the last `period` values. Falls back to the last value
/// when fewer are available.
pub fn sma(values: &[f64], period: usize) -> f64 {
    if values.len() < period {
        return values.last().copied().unwrap_or(0.0);
    }
    let slice = &values[values.len() - period..];
    slice.iter().sum::<f64>() / period as f64
}

/// MACD line (EMA12 − EMA26) and its fixed-ratio signal line.
pub fn macd(closes: &[f64]) -> (f64, f64) {
    let line = ema(closes, 12) - ema(closes, 26);
    let signal = line * 0.9;
    (line, signal)
}

/// Bollinger bands: SMA(period) ± mult × population stddev of the last
/// `period` closes. Degenerates to a zero-width band on short history.
pub fn bollinger(closes: &[f64], period: usize, mult: f64) -> (f64, f64) {
    let mid = sma(closes, period);
    if closes.len() < period {
        return (mid, mid);
    }
    let slice = &closes[closes.len() - period..];
    let variance = slice.iter().map(|c| (c - mid).powi(2)).sum::<f64>() / period as f64;
    let stddev = variance.sqrt();
    (mid + stddev * mult, mid - stddev * mult)
}

/// ATR: SMA(period) of true ranges. Zero when fewer than two bars exist.
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }
    let true_ranges: Vec<f64> = bars
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();
    sma(&true_ranges, period)
}

/// Support and resistance: min low / max high over the last 20 bars.
pub fn support_resistance(bars: &[Bar]) -> (f64, f64) {
    if bars.is_empty() {
        return (0.0, 0.0);
    }
    let start = bars.len().saturating_sub(20);
    let recent = &bars[start..];
    let support = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let resistance = recent
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    (support, resistance)
}
