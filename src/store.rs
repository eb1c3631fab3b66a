use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::JournalError;
use crate::models::{Account, Strategy, Trade, Withdrawal};

/// Partial balance update for an account. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BalancePatch {
    pub starting_balance: Option<f64>,
    pub current_balance: Option<f64>,
}

/// Contract the journal requires from a ledger store. All operations take
/// the owning account id explicitly; implementations must scope every row
/// to it and never rely on implicit session state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_account(&self, account: &Account) -> Result<(), JournalError>;
    async fn get_account(&self, account_id: &str) -> Result<Account, JournalError>;
    async fn update_account_balance(
        &self,
        account_id: &str,
        patch: BalancePatch,
    ) -> Result<(), JournalError>;

    /// Trades for the account, most recent first.
    async fn list_trades(&self, account_id: &str) -> Result<Vec<Trade>, JournalError>;
    async fn insert_trade(&self, trade: &Trade) -> Result<(), JournalError>;
    async fn delete_trade(&self, account_id: &str, trade_id: &str) -> Result<(), JournalError>;
    /// Returns the number of rows removed.
    async fn delete_all_trades(&self, account_id: &str) -> Result<usize, JournalError>;

    /// Withdrawals for the account, most recent first.
    async fn list_withdrawals(&self, account_id: &str) -> Result<Vec<Withdrawal>, JournalError>;
    async fn insert_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), JournalError>;
    async fn delete_withdrawal(
        &self,
        account_id: &str,
        withdrawal_id: &str,
    ) -> Result<(), JournalError>;
    async fn delete_all_withdrawals(&self, account_id: &str) -> Result<usize, JournalError>;

    async fn list_strategies(&self, account_id: &str) -> Result<Vec<Strategy>, JournalError>;
    async fn insert_strategy(&self, strategy: &Strategy) -> Result<(), JournalError>;
}
