//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::event_adapter::BroadcastEventSink;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::memory_adapter::MemoryStore;
use crate::adapters::sim_adapter::{DriftKey, DriftingSource, MarketSimulator};
use crate::domain::analysis::{IndicatorAnalyzer, TechnicalSource, technical_opinion};
use crate::domain::config::ScheduleConfig;
use crate::domain::error::FxforgeError;
use crate::domain::fusion::{FactorSources, SignalFusionEngine};
use crate::domain::indicator;
use crate::domain::instrument::Timeframe;
use crate::domain::lifecycle::TradeLifecycleManager;
use crate::domain::risk::RiskValidator;
use crate::orchestrator::Orchestrator;

#[derive(Parser, Debug)]
#[command(name = "fxforge", about = "Simulated multi-factor forex trading bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trading bot simulation
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compute indicators over a CSV bar file
    Scan {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = "1h")]
        timeframe: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    match cli.command {
        Command::Run { config } => run_bot(config.as_ref()),
        Command::Scan {
            data,
            symbol,
            timeframe,
        } => run_scan(&data, &symbol, &timeframe),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, FxforgeError> {
    match path {
        Some(path) => FileConfigAdapter::from_file(path),
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn run_bot(config_path: Option<&PathBuf>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(adapter) => adapter,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let schedule = match ScheduleConfig::from_config(&config) {
        Ok(schedule) => schedule,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let store = Arc::new(MemoryStore::new());
    let feed = Arc::new(MarketSimulator::new(store.clone(), store.clone()));
    let analyzer = IndicatorAnalyzer::new(store.clone(), store.clone());
    let fusion = SignalFusionEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        FactorSources {
            technical: Arc::new(TechnicalSource::new(store.clone())),
            fundamental: Arc::new(DriftingSource::new(DriftKey::BaseCurrency)),
            sentiment: Arc::new(DriftingSource::new(DriftKey::Symbol)),
            cot: Arc::new(DriftingSource::new(DriftKey::Symbol)),
        },
    );
    let lifecycle = TradeLifecycleManager::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        RiskValidator::new(store.clone(), store.clone()),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        schedule,
        store.clone(),
        feed,
        analyzer,
        fusion,
        lifecycle,
        store,
        Arc::new(BroadcastEventSink::new()),
    ));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(async {
        tokio::select! {
            _ = orchestrator.run() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
            }
        }
    });

    ExitCode::SUCCESS
}

fn run_scan(data: &PathBuf, symbol: &str, timeframe: &str) -> ExitCode {
    let Some(timeframe) = Timeframe::parse(timeframe) else {
        eprintln!("error: unknown timeframe {timeframe} (expected 1m, 5m, 15m, 1h, 4h or 1d)");
        return ExitCode::from(2);
    };

    let bars = match CsvBarAdapter::load_bars(data, 1, timeframe) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Loaded {} bars for {} ({})", bars.len(), symbol, timeframe);

    let Some(set) = indicator::compute(&bars) else {
        eprintln!(
            "error: not enough bars to compute indicators (need {}, have {})",
            indicator::MIN_BARS,
            bars.len()
        );
        return ExitCode::from(4);
    };

    println!("RSI(14):          {:.2}", set.rsi);
    println!("MACD:             {:.5}", set.macd);
    println!("MACD signal:      {:.5}", set.macd_signal);
    println!("MA50:             {:.5}", set.ma50);
    println!("MA200:            {:.5}", set.ma200);
    println!("Bollinger upper:  {:.5}", set.bollinger_upper);
    println!("Bollinger lower:  {:.5}", set.bollinger_lower);
    println!("ATR(14):          {:.5}", set.atr);
    println!("Support:          {:.5}", set.support_level);
    println!("Resistance:       {:.5}", set.resistance_level);

    let opinion = technical_opinion(&set);
    println!(
        "Technical signal: {} ({:.1}% confidence)",
        opinion.direction, opinion.confidence
    );

    ExitCode::SUCCESS
}
