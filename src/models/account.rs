use serde::{Deserialize, Serialize};

/// Profile row for an authenticated trader. `current_balance` is kept
/// consistent with the ledger by the service layer after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub starting_balance: f64,
    pub current_balance: f64,
    pub created_at: i64,
}
