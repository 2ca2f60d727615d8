//! Runtime configuration for the cycle scheduler.

use crate::domain::error::FxforgeError;
use crate::ports::config_port::ConfigPort;

/// Cycle cadences in seconds, the user the bot trades as, and an optional
/// instrument list overriding the default universe.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub data_refresh_secs: u64,
    pub signal_secs: u64,
    pub trade_secs: u64,
    pub exit_check_secs: u64,
    pub user_id: i64,
    /// Symbols to trade; empty means the built-in six-instrument universe.
    pub instruments: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            data_refresh_secs: 120,
            signal_secs: 600,
            trade_secs: 900,
            exit_check_secs: 60,
            user_id: 1,
            instruments: Vec::new(),
        }
    }
}

impl ScheduleConfig {
    /// Read from the `[schedule]` section, falling back to defaults for
    /// missing keys. Non-positive intervals are configuration errors.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FxforgeError> {
        let defaults = ScheduleConfig::default();
        let loaded = ScheduleConfig {
            data_refresh_secs: read_interval(config, "data_refresh_secs", defaults.data_refresh_secs)?,
            signal_secs: read_interval(config, "signal_secs", defaults.signal_secs)?,
            trade_secs: read_interval(config, "trade_secs", defaults.trade_secs)?,
            exit_check_secs: read_interval(config, "exit_check_secs", defaults.exit_check_secs)?,
            user_id: config.get_int("schedule", "user_id", defaults.user_id),
            instruments: read_symbols(config),
        };
        Ok(loaded)
    }
}

/// Comma-separated `[universe] symbols`, uppercased. Absent or blank means
/// the default universe.
fn read_symbols(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string("universe", "symbols")
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn read_interval(config: &dyn ConfigPort, key: &str, default: u64) -> Result<u64, FxforgeError> {
    let value = config.get_int("schedule", key, default as i64);
    if value <= 0 {
        return Err(FxforgeError::ConfigInvalid {
            section: "schedule".to_string(),
            key: key.to_string(),
            reason: format!("interval must be positive, got {}", value),
        });
    }
    Ok(value as u64)
}
