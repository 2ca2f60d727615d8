//! Risk limits: position sizing, the pre-trade validation gate, and the
//! account-level risk snapshot.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::trade::{TradeStatus, TradeType};
use crate::domain::error::FxforgeError;
use crate::ports::trade_port::{RiskProfileStore, TradeStore};

/// Fixed paper trading account balance in dollars.
pub const ACCOUNT_BALANCE: f64 = 10_000.0;

pub const MAX_TRADES_PER_INSTRUMENT: usize = 3;
pub const MAX_OPEN_TRADES: usize = 10;

/// How many recent trades the validation checks look back over.
const HISTORY_WINDOW: usize = 100;

/// Per-user risk limits. Created with defaults on first use.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskProfile {
    /// Dollar risk allowed across trades opened in one day.
    pub max_daily_risk: f64,
    /// Position size cap in lots.
    pub max_position_size: f64,
    /// Drawdown limit as a percentage of the account.
    pub max_drawdown: f64,
    pub auto_stop_loss: bool,
    /// When set, oversized positions are clamped instead of rejected.
    pub risk_scaling: bool,
    pub weekend_trading: bool,
}

impl Default for RiskProfile {
    fn default() -> Self {
        RiskProfile {
            max_daily_risk: 500.0,
            max_position_size: 0.10,
            max_drawdown: 5.0,
            auto_stop_loss: true,
            risk_scaling: true,
            weekend_trading: false,
        }
    }
}

/// A proposed trade, as seen by the validation gate.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub user_id: i64,
    pub instrument_id: i64,
    pub trade_type: TradeType,
    pub position_size: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Approved {
        /// Set when risk scaling clamped the requested size.
        adjusted_size: Option<f64>,
    },
    Rejected {
        reason: String,
    },
}

/// Account-level risk snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskMetrics {
    pub daily_risk_used: f64,
    pub max_daily_risk: f64,
    pub current_drawdown: f64,
    pub max_drawdown: f64,
    pub open_trades: usize,
    /// 0-100, higher is riskier.
    pub risk_score: f64,
}

pub struct RiskValidator {
    profiles: Arc<dyn RiskProfileStore>,
    trades: Arc<dyn TradeStore>,
}

impl RiskValidator {
    pub fn new(profiles: Arc<dyn RiskProfileStore>, trades: Arc<dyn TradeStore>) -> Self {
        RiskValidator { profiles, trades }
    }

    /// Size a position so that being stopped out loses `risk_percentage` of
    /// the account, capped at the user's maximum size. A zero stop distance
    /// sizes to zero.
    pub fn calculate_position_size(
        &self,
        user_id: i64,
        entry_price: f64,
        stop_loss: f64,
        risk_percentage: f64,
    ) -> Result<f64, FxforgeError> {
        let risk_amount = ACCOUNT_BALANCE * risk_percentage / 100.0;
        let stop_distance = (entry_price - stop_loss).abs();
        if stop_distance == 0.0 {
            return Ok(0.0);
        }

        let max_position_size = self
            .profiles
            .get(user_id)?
            .map(|p| p.max_position_size)
            .unwrap_or(RiskProfile::default().max_position_size);

        Ok((risk_amount / stop_distance).min(max_position_size))
    }

    /// Run the four checks in order: daily risk, position size, drawdown,
    /// exposure. The first failure wins. A user with no stored profile gets
    /// the defaults written and the trade accepted.
    pub fn validate_trade(
        &self,
        intent: &TradeIntent,
        now: DateTime<Utc>,
    ) -> Result<Verdict, FxforgeError> {
        let Some(profile) = self.profiles.get(intent.user_id)? else {
            self.profiles
                .upsert(intent.user_id, RiskProfile::default())?;
            return Ok(Verdict::Approved {
                adjusted_size: None,
            });
        };

        if let Some(rejection) = self.check_daily_risk(intent, &profile, now)? {
            return Ok(rejection);
        }

        let adjusted_size = match self.check_position_size(intent, &profile) {
            Ok(adjusted) => adjusted,
            Err(rejection) => return Ok(rejection),
        };

        if let Some(rejection) = self.check_drawdown(intent.user_id, &profile)? {
            return Ok(rejection);
        }

        if let Some(rejection) = self.check_exposure(intent.user_id, intent.instrument_id)? {
            return Ok(rejection);
        }

        Ok(Verdict::Approved { adjusted_size })
    }

    fn check_daily_risk(
        &self,
        intent: &TradeIntent,
        profile: &RiskProfile,
        now: DateTime<Utc>,
    ) -> Result<Option<Verdict>, FxforgeError> {
        let today_risk = self.daily_risk_used(intent.user_id, now)?;
        let new_trade_risk = (intent.entry_price - intent.stop_loss).abs() * intent.position_size;

        if today_risk + new_trade_risk > profile.max_daily_risk {
            return Ok(Some(Verdict::Rejected {
                reason: format!(
                    "Daily risk limit exceeded. Current: ${:.2}, New trade: ${:.2}, Limit: ${:.2}",
                    today_risk, new_trade_risk, profile.max_daily_risk
                ),
            }));
        }
        Ok(None)
    }

    fn check_position_size(
        &self,
        intent: &TradeIntent,
        profile: &RiskProfile,
    ) -> Result<Option<f64>, Verdict> {
        if intent.position_size <= profile.max_position_size {
            return Ok(None);
        }
        if profile.risk_scaling {
            Ok(Some(profile.max_position_size))
        } else {
            Err(Verdict::Rejected {
                reason: format!(
                    "Position size {} exceeds maximum {}",
                    intent.position_size, profile.max_position_size
                ),
            })
        }
    }

    fn check_drawdown(
        &self,
        user_id: i64,
        profile: &RiskProfile,
    ) -> Result<Option<Verdict>, FxforgeError> {
        let drawdown = self.current_drawdown(user_id)?;
        if drawdown > profile.max_drawdown {
            return Ok(Some(Verdict::Rejected {
                reason: format!(
                    "Maximum drawdown exceeded. Current: {:.2}%, Limit: {}%",
                    drawdown, profile.max_drawdown
                ),
            }));
        }
        Ok(None)
    }

    fn check_exposure(
        &self,
        user_id: i64,
        instrument_id: i64,
    ) -> Result<Option<Verdict>, FxforgeError> {
        let open = self.trades.open_trades(user_id)?;
        let same_instrument = open
            .iter()
            .filter(|t| t.instrument_id == instrument_id)
            .count();

        if same_instrument >= MAX_TRADES_PER_INSTRUMENT {
            return Ok(Some(Verdict::Rejected {
                reason: format!(
                    "Maximum trades per instrument exceeded (limit: {}, current: {})",
                    MAX_TRADES_PER_INSTRUMENT, same_instrument
                ),
            }));
        }
        if open.len() >= MAX_OPEN_TRADES {
            return Ok(Some(Verdict::Rejected {
                reason: format!(
                    "Maximum total open trades exceeded (limit: {}, current: {})",
                    MAX_OPEN_TRADES,
                    open.len()
                ),
            }));
        }
        Ok(None)
    }

    /// Dollar risk committed by trades still open that were opened today.
    fn daily_risk_used(&self, user_id: i64, now: DateTime<Utc>) -> Result<f64, FxforgeError> {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or(now);

        let recent = self.trades.history(user_id, HISTORY_WINDOW)?;
        Ok(recent
            .iter()
            .filter(|t| t.status == TradeStatus::Open && t.opened_at >= midnight)
            .map(|t| t.committed_risk())
            .sum())
    }

    /// Drawdown as |min(realized pnl, 0)| over the account, in percent.
    fn current_drawdown(&self, user_id: i64) -> Result<f64, FxforgeError> {
        let recent = self.trades.history(user_id, HISTORY_WINDOW)?;
        let total_pnl: f64 = recent
            .iter()
            .filter(|t| t.status != TradeStatus::Open)
            .filter_map(|t| t.pnl)
            .sum();
        Ok(total_pnl.min(0.0).abs() / ACCOUNT_BALANCE * 100.0)
    }

    /// Account risk snapshot: daily usage, drawdown, and a blended 0-100
    /// score (50% daily risk, 30% drawdown, 20% open trade count).
    pub fn risk_metrics(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<RiskMetrics, FxforgeError> {
        let profile = self.profiles.get(user_id)?.unwrap_or_default();
        let daily_risk_used = self.daily_risk_used(user_id, now)?;
        let current_drawdown = self.current_drawdown(user_id)?;
        let open_trades = self.trades.open_trades(user_id)?.len();

        let risk_score = (daily_risk_used / profile.max_daily_risk * 50.0
            + current_drawdown / profile.max_drawdown * 30.0
            + open_trades as f64 / MAX_OPEN_TRADES as f64 * 20.0)
            .min(100.0);

        Ok(RiskMetrics {
            daily_risk_used,
            max_daily_risk: profile.max_daily_risk,
            current_drawdown,
            max_drawdown: profile.max_drawdown,
            open_trades,
            risk_score,
        })
    }
}
