use serde::{Deserialize, Serialize};

/// Classification tag for backtest analytics. Trades reference a strategy
/// by name, not id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub category: String,
    pub created_at: i64,
}
