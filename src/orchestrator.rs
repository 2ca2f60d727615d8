//! Cycle orchestrator: owns the wired components and drives them on four
//! independent cadences (data refresh, signal generation, trade execution,
//! exit monitoring).
//!
//! Each cycle is single-flight: if a tick fires while the previous run of
//! the same cycle is still going, the tick is dropped. Per-instrument
//! failures are logged and skipped so one bad instrument never stalls the
//! rest of the universe.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::domain::analysis::IndicatorAnalyzer;
use crate::domain::config::ScheduleConfig;
use crate::domain::fusion::SignalFusionEngine;
use crate::domain::instrument::{default_universe, kind_for_symbol};
use crate::domain::lifecycle::{ExecutionOutcome, TradeLifecycleManager};
use crate::domain::signal::TradingSignal;
use crate::ports::event_port::{BotEvent, EventSink};
use crate::ports::market_port::{InstrumentStore, MarketDataFeed};
use crate::ports::signal_port::SignalStore;

/// Only signals above this confidence are auto-executed.
pub const EXECUTION_CONFIDENCE: f64 = 70.0;

pub struct Orchestrator {
    config: ScheduleConfig,
    instruments: Arc<dyn InstrumentStore>,
    feed: Arc<dyn MarketDataFeed>,
    analyzer: IndicatorAnalyzer,
    fusion: SignalFusionEngine,
    lifecycle: TradeLifecycleManager,
    signals: Arc<dyn SignalStore>,
    events: Arc<dyn EventSink>,
    data_guard: Mutex<()>,
    signal_guard: Mutex<()>,
    trade_guard: Mutex<()>,
    exit_guard: Mutex<()>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ScheduleConfig,
        instruments: Arc<dyn InstrumentStore>,
        feed: Arc<dyn MarketDataFeed>,
        analyzer: IndicatorAnalyzer,
        fusion: SignalFusionEngine,
        lifecycle: TradeLifecycleManager,
        signals: Arc<dyn SignalStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Orchestrator {
            config,
            instruments,
            feed,
            analyzer,
            fusion,
            lifecycle,
            signals,
            events,
            data_guard: Mutex::new(()),
            signal_guard: Mutex::new(()),
            trade_guard: Mutex::new(()),
            exit_guard: Mutex::new(()),
        }
    }

    /// Seed the universe and run one data and one signal pass so the loops
    /// start against populated stores.
    pub fn bootstrap(&self) {
        if let Err(e) = self.ensure_universe() {
            error!(error = %e, "failed to seed instrument universe");
            return;
        }
        self.data_tick();
        self.signal_tick();
        info!("bootstrap complete");
    }

    fn ensure_universe(&self) -> Result<(), crate::domain::error::FxforgeError> {
        let defaults = default_universe();
        if self.config.instruments.is_empty() {
            for (symbol, name, kind) in defaults {
                if self.instruments.find_by_symbol(symbol)?.is_none() {
                    self.instruments.create(symbol, name, kind)?;
                    info!(symbol, "created instrument");
                }
            }
            return Ok(());
        }

        // Configured symbols keep their default name/kind when known.
        for symbol in &self.config.instruments {
            if self.instruments.find_by_symbol(symbol)?.is_none() {
                let (name, kind) = defaults
                    .iter()
                    .find(|(s, _, _)| *s == symbol.as_str())
                    .map(|(_, n, k)| ((*n).to_string(), *k))
                    .unwrap_or_else(|| (symbol.clone(), kind_for_symbol(symbol)));
                self.instruments.create(symbol, &name, kind)?;
                info!(symbol = %symbol, "created instrument");
            }
        }
        Ok(())
    }

    fn data_tick(&self) {
        let now = Utc::now();
        match self.feed.refresh(now) {
            Ok(written) => info!(bars = written, "market data refreshed"),
            Err(e) => error!(error = %e, "market data refresh failed"),
        }
    }

    fn signal_tick(&self) {
        let now = Utc::now();
        let instruments = match self.instruments.all() {
            Ok(instruments) => instruments,
            Err(e) => {
                error!(error = %e, "could not list instruments");
                return;
            }
        };

        let mut new_signals: Vec<TradingSignal> = Vec::new();
        for instrument in &instruments {
            if let Err(e) = self.analyzer.analyze_instrument(instrument.id, now) {
                warn!(symbol = %instrument.symbol, error = %e, "indicator analysis failed");
                continue;
            }
            match self.fusion.generate_for_instrument(instrument, now) {
                Ok(signals) => {
                    if !signals.is_empty() {
                        info!(
                            symbol = %instrument.symbol,
                            count = signals.len(),
                            "signals generated"
                        );
                    }
                    new_signals.extend(signals);
                }
                Err(e) => {
                    warn!(symbol = %instrument.symbol, error = %e, "signal generation failed")
                }
            }
        }

        if !new_signals.is_empty() {
            if let Err(e) = self.events.publish(&BotEvent::NewSignals(new_signals)) {
                warn!(error = %e, "event publish failed");
            }
        }
    }

    fn trade_tick(&self) {
        let now = Utc::now();
        let active = match self.signals.active_signals() {
            Ok(active) => active,
            Err(e) => {
                error!(error = %e, "could not list active signals");
                return;
            }
        };

        for signal in active {
            if signal.confidence <= EXECUTION_CONFIDENCE {
                continue;
            }
            match self
                .lifecycle
                .execute_trade(signal.id, self.config.user_id, now)
            {
                Ok(ExecutionOutcome::Opened(trade)) => {
                    info!(signal_id = signal.id, trade_id = trade.id, "signal executed");
                    // A signal backs at most one trade.
                    if let Err(e) = self.signals.deactivate(signal.id) {
                        warn!(signal_id = signal.id, error = %e, "signal deactivation failed");
                    }
                }
                Ok(ExecutionOutcome::Rejected { reason }) => {
                    info!(signal_id = signal.id, reason = %reason, "trade rejected");
                }
                Err(e) => {
                    warn!(signal_id = signal.id, error = %e, "trade execution failed");
                }
            }
        }
    }

    fn exit_tick(&self) {
        let now = Utc::now();
        match self.lifecycle.check_exits(self.config.user_id, now) {
            Ok(summary) => {
                if summary.closed > 0 || summary.stops_trailed > 0 {
                    info!(
                        closed = summary.closed,
                        trailed = summary.stops_trailed,
                        "exit sweep"
                    );
                }
            }
            Err(e) => error!(error = %e, "exit sweep failed"),
        }
    }

    /// Run until the task is aborted. Spawns one loop per cycle; ticks that
    /// land while the previous run of the same cycle is in flight are
    /// skipped via `try_lock`.
    pub async fn run(self: Arc<Self>) {
        self.bootstrap();

        let data = tokio::spawn(cycle_loop(
            self.clone(),
            self.config.data_refresh_secs,
            |o| {
                if let Ok(_guard) = o.data_guard.try_lock() {
                    o.data_tick();
                }
            },
        ));
        let signals = tokio::spawn(cycle_loop(self.clone(), self.config.signal_secs, |o| {
            if let Ok(_guard) = o.signal_guard.try_lock() {
                o.signal_tick();
            }
        }));
        let trades = tokio::spawn(cycle_loop(self.clone(), self.config.trade_secs, |o| {
            if let Ok(_guard) = o.trade_guard.try_lock() {
                o.trade_tick();
            }
        }));
        let exits = tokio::spawn(cycle_loop(self.clone(), self.config.exit_check_secs, |o| {
            if let Ok(_guard) = o.exit_guard.try_lock() {
                o.exit_tick();
            }
        }));

        // The loops never return on their own; this only resolves if one
        // panics or the whole task is aborted.
        let _ = tokio::try_join!(data, signals, trades, exits);
    }
}

async fn cycle_loop(
    orchestrator: Arc<Orchestrator>,
    period_secs: u64,
    tick: impl Fn(&Orchestrator) + Send + 'static,
) {
    let mut interval = time::interval(Duration::from_secs(period_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick fires immediately; bootstrap already covered it.
    interval.tick().await;
    loop {
        interval.tick().await;
        tick(&orchestrator);
    }
}
