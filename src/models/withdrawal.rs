use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A withdrawal from the account. `balance_before`/`balance_after` are
/// historical snapshots taken at creation time and are never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub remarks: Option<String>,
    pub created_at: i64,
}
