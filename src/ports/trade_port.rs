//! Paper trade and risk profile store ports.

use crate::domain::error::FxforgeError;
use crate::domain::risk::RiskProfile;
use crate::domain::trade::{NewTrade, PaperTrade, TradePatch};

pub trait TradeStore: Send + Sync {
    fn open_trades(&self, user_id: i64) -> Result<Vec<PaperTrade>, FxforgeError>;

    /// Most recent trades first, capped at `limit`.
    fn history(&self, user_id: i64, limit: usize) -> Result<Vec<PaperTrade>, FxforgeError>;

    fn create(&self, trade: NewTrade) -> Result<PaperTrade, FxforgeError>;

    fn update(&self, id: i64, patch: TradePatch) -> Result<PaperTrade, FxforgeError>;
}

pub trait RiskProfileStore: Send + Sync {
    fn get(&self, user_id: i64) -> Result<Option<RiskProfile>, FxforgeError>;

    fn upsert(&self, user_id: i64, profile: RiskProfile) -> Result<(), FxforgeError>;
}
