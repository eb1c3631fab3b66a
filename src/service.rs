//! Session-scoped journal façade. One `JournalService` per authenticated
//! account; all mutating operations go through an async mutex so concurrent
//! callers observe the ledger and the running balance move together.
//!
//! Write protocol for every mutation: validate, write the ledger row, then
//! write the balance. If the balance write fails the ledger write is
//! compensated; a failed compensation surfaces as `Partial` so the caller
//! knows the store needs manual reconciliation.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::balance;
use crate::error::JournalError;
use crate::export;
use crate::filter::{today_utc, TradeFilter};
use crate::models::{Account, CreateTradeInput, Strategy, Trade, Withdrawal};
use crate::store::{BalancePatch, LedgerStore};

const MAX_STARTING_BALANCE: f64 = 1_000_000_000.0;

/// Immutable copy of the session ledgers, handed to the aggregation and
/// export functions.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub account: Account,
    pub trades: Vec<Trade>,
    pub withdrawals: Vec<Withdrawal>,
    pub strategies: Vec<Strategy>,
}

struct SessionState {
    account: Account,
    trades: Vec<Trade>,
    withdrawals: Vec<Withdrawal>,
    strategies: Vec<Strategy>,
}

impl SessionState {
    // Keep the cached trade list in store order: date, then recency of entry.
    fn sort_trades(&mut self) {
        self.trades
            .sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    }

    fn sort_withdrawals(&mut self) {
        self.withdrawals
            .sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    }
}

pub struct JournalService {
    store: Arc<dyn LedgerStore>,
    account_id: String,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for JournalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalService")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn validate_starting_balance(value: f64) -> Result<f64, JournalError> {
    if !value.is_finite() {
        return Err(JournalError::Validation(
            "starting balance must be a finite number".to_string(),
        ));
    }
    if !(0.0..=MAX_STARTING_BALANCE).contains(&value) {
        return Err(JournalError::Validation(format!(
            "starting balance must be between 0 and {}",
            MAX_STARTING_BALANCE
        )));
    }
    Ok(balance::round_cents(value))
}

impl JournalService {
    /// Open a session for an existing account, loading its ledgers into the
    /// cache. An unknown account id means there is no authenticated session.
    pub async fn open(store: Arc<dyn LedgerStore>, account_id: &str) -> Result<Self, JournalError> {
        let account = match store.get_account(account_id).await {
            Ok(account) => account,
            Err(JournalError::NotFound(_)) => return Err(JournalError::Unauthenticated),
            Err(e) => return Err(e),
        };
        let trades = store.list_trades(account_id).await?;
        let withdrawals = store.list_withdrawals(account_id).await?;
        let strategies = store.list_strategies(account_id).await?;
        log::info!(
            "Opened journal for {}: {} trades, {} withdrawals",
            account_id,
            trades.len(),
            withdrawals.len()
        );

        Ok(JournalService {
            store,
            account_id: account_id.to_string(),
            state: Mutex::new(SessionState {
                account,
                trades,
                withdrawals,
                strategies,
            }),
        })
    }

    /// Create a fresh account and open a session for it.
    pub async fn register(
        store: Arc<dyn LedgerStore>,
        email: &str,
        starting_balance: f64,
    ) -> Result<Self, JournalError> {
        let starting_balance = validate_starting_balance(starting_balance)?;
        let account = Account {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            starting_balance,
            current_balance: starting_balance,
            created_at: now_millis(),
        };
        store.create_account(&account).await?;
        log::info!("Registered account {} ({})", account.id, email);
        Self::open(store, &account.id).await
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Reload the cached ledgers from the store. The session lock is held
    /// across the fetches so no mutation can commit between the store reads
    /// and the cache write and then be overwritten by the stale snapshot.
    pub async fn refresh(&self) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        let account = self.store.get_account(&self.account_id).await?;
        let trades = self.store.list_trades(&self.account_id).await?;
        let withdrawals = self.store.list_withdrawals(&self.account_id).await?;
        let strategies = self.store.list_strategies(&self.account_id).await?;

        state.account = account;
        state.trades = trades;
        state.withdrawals = withdrawals;
        state.strategies = strategies;
        Ok(())
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock().await;
        LedgerSnapshot {
            account: state.account.clone(),
            trades: state.trades.clone(),
            withdrawals: state.withdrawals.clone(),
            strategies: state.strategies.clone(),
        }
    }

    pub async fn current_balance(&self) -> f64 {
        self.state.lock().await.account.current_balance
    }

    /// Record a trade and advance the running balance by its result. The
    /// balance snapshot stored on the trade is taken against the full ledger
    /// at this instant.
    pub async fn add_trade(&self, input: CreateTradeInput) -> Result<Trade, JournalError> {
        if input.pair.trim().is_empty() {
            return Err(JournalError::Validation("pair must not be empty".to_string()));
        }
        if !input.sl_pips.is_finite() || input.sl_pips <= 0.0 {
            return Err(JournalError::Validation(
                "stop loss pips must be a positive number".to_string(),
            ));
        }
        if !input.tp_pips.is_finite() || input.tp_pips < 0.0 {
            return Err(JournalError::Validation(
                "take profit pips must be a non-negative number".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let new_balance = balance::apply_trade_result(state.account.current_balance, input.result)?;

        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id.clone(),
            date: input.date,
            pair: input.pair.trim().to_string(),
            session: input.session,
            timeframe: input.timeframe,
            direction: input.direction,
            sl_pips: input.sl_pips,
            tp_pips: input.tp_pips,
            risk_reward_ratio: balance::round_cents(input.tp_pips / input.sl_pips),
            outcome: input.outcome,
            result: input.result,
            balance_after_trade: new_balance,
            account_kind: input.account_kind,
            strategy_name: input.strategy_name,
            image_link: input.image_link,
            remarks: input.remarks,
            created_at: now_millis(),
        };

        self.store.insert_trade(&trade).await?;
        if let Err(e) = self.write_balance(new_balance).await {
            log::warn!("Balance write failed after trade insert, rolling back: {}", e);
            return match self.store.delete_trade(&self.account_id, &trade.id).await {
                Ok(()) => Err(e),
                Err(undo) => Err(JournalError::Partial(format!(
                    "trade {} persisted but balance update failed ({}); rollback failed: {}",
                    trade.id, e, undo
                ))),
            };
        }

        state.account.current_balance = new_balance;
        state.trades.push(trade.clone());
        state.sort_trades();
        log::info!("Recorded trade {} ({:+.2})", trade.id, trade.result);
        Ok(trade)
    }

    /// Remove a trade and back its result out of the running balance.
    pub async fn delete_trade(&self, trade_id: &str) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        let trade = state
            .trades
            .iter()
            .find(|t| t.id == trade_id)
            .cloned()
            .ok_or_else(|| JournalError::NotFound("trade".to_string()))?;

        let new_balance =
            balance::reverse_trade_result(state.account.current_balance, trade.result)?;

        self.store.delete_trade(&self.account_id, trade_id).await?;
        if let Err(e) = self.write_balance(new_balance).await {
            log::warn!("Balance write failed after trade delete, restoring: {}", e);
            return match self.store.insert_trade(&trade).await {
                Ok(()) => Err(e),
                Err(undo) => Err(JournalError::Partial(format!(
                    "trade {} deleted but balance update failed ({}); restore failed: {}",
                    trade_id, e, undo
                ))),
            };
        }

        state.account.current_balance = new_balance;
        state.trades.retain(|t| t.id != trade_id);
        Ok(())
    }

    /// Clear the trade ledger. The balance resets to the starting balance
    /// less everything already withdrawn, keeping the ledger equation intact.
    pub async fn delete_all_trades(&self) -> Result<usize, JournalError> {
        let mut state = self.state.lock().await;
        let new_balance = balance::recalculate_from_starting(
            state.account.starting_balance,
            &[],
            &state.withdrawals,
        );

        let removed = self.store.delete_all_trades(&self.account_id).await?;
        if let Err(e) = self.write_balance(new_balance).await {
            // Deleted rows cannot be restored; surface the inconsistency.
            return Err(JournalError::Partial(format!(
                "{} trades deleted but balance update failed: {}",
                removed, e
            )));
        }

        state.account.current_balance = new_balance;
        state.trades.clear();
        log::info!("Cleared {} trades; balance reset to {:.2}", removed, new_balance);
        Ok(removed)
    }

    /// Record a withdrawal with balance snapshots taken at this instant.
    pub async fn add_withdrawal(
        &self,
        date: NaiveDate,
        amount: f64,
        remarks: Option<String>,
    ) -> Result<Withdrawal, JournalError> {
        let mut state = self.state.lock().await;
        let snapshot = balance::apply_withdrawal(state.account.current_balance, amount)?;

        let withdrawal = Withdrawal {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id.clone(),
            date,
            amount: balance::round_cents(amount),
            balance_before: snapshot.balance_before,
            balance_after: snapshot.balance_after,
            remarks,
            created_at: now_millis(),
        };

        self.store.insert_withdrawal(&withdrawal).await?;
        if let Err(e) = self.write_balance(snapshot.balance_after).await {
            log::warn!("Balance write failed after withdrawal insert, rolling back: {}", e);
            return match self
                .store
                .delete_withdrawal(&self.account_id, &withdrawal.id)
                .await
            {
                Ok(()) => Err(e),
                Err(undo) => Err(JournalError::Partial(format!(
                    "withdrawal {} persisted but balance update failed ({}); rollback failed: {}",
                    withdrawal.id, e, undo
                ))),
            };
        }

        state.account.current_balance = snapshot.balance_after;
        state.withdrawals.push(withdrawal.clone());
        state.sort_withdrawals();
        log::info!("Recorded withdrawal {} (-{:.2})", withdrawal.id, withdrawal.amount);
        Ok(withdrawal)
    }

    /// Remove a withdrawal and add its amount back into the balance.
    pub async fn delete_withdrawal(&self, withdrawal_id: &str) -> Result<(), JournalError> {
        let mut state = self.state.lock().await;
        let withdrawal = state
            .withdrawals
            .iter()
            .find(|w| w.id == withdrawal_id)
            .cloned()
            .ok_or_else(|| JournalError::NotFound("withdrawal".to_string()))?;

        let new_balance =
            balance::reverse_withdrawal(state.account.current_balance, withdrawal.amount)?;

        self.store
            .delete_withdrawal(&self.account_id, withdrawal_id)
            .await?;
        if let Err(e) = self.write_balance(new_balance).await {
            log::warn!("Balance write failed after withdrawal delete, restoring: {}", e);
            return match self.store.insert_withdrawal(&withdrawal).await {
                Ok(()) => Err(e),
                Err(undo) => Err(JournalError::Partial(format!(
                    "withdrawal {} deleted but balance update failed ({}); restore failed: {}",
                    withdrawal_id, e, undo
                ))),
            };
        }

        state.account.current_balance = new_balance;
        state.withdrawals.retain(|w| w.id != withdrawal_id);
        Ok(())
    }

    /// Clear the withdrawal ledger, returning all withdrawn funds to the
    /// balance.
    pub async fn delete_all_withdrawals(&self) -> Result<usize, JournalError> {
        let mut state = self.state.lock().await;
        let returned: f64 = state.withdrawals.iter().map(|w| w.amount).sum();
        let new_balance = balance::round_cents(state.account.current_balance + returned);

        let removed = self.store.delete_all_withdrawals(&self.account_id).await?;
        if let Err(e) = self.write_balance(new_balance).await {
            return Err(JournalError::Partial(format!(
                "{} withdrawals deleted but balance update failed: {}",
                removed, e
            )));
        }

        state.account.current_balance = new_balance;
        state.withdrawals.clear();
        log::info!("Cleared {} withdrawals; balance now {:.2}", removed, new_balance);
        Ok(removed)
    }

    /// Redefine the starting balance retroactively and recompute the current
    /// balance from the full ledger. Returns the new current balance.
    pub async fn update_starting_balance(&self, value: f64) -> Result<f64, JournalError> {
        let starting = validate_starting_balance(value)?;

        let mut state = self.state.lock().await;
        let current =
            balance::recalculate_from_starting(starting, &state.trades, &state.withdrawals);

        self.store
            .update_account_balance(
                &self.account_id,
                BalancePatch {
                    starting_balance: Some(starting),
                    current_balance: Some(current),
                },
            )
            .await?;

        state.account.starting_balance = starting;
        state.account.current_balance = current;
        log::info!("Starting balance set to {:.2}; current balance {:.2}", starting, current);
        Ok(current)
    }

    pub async fn add_strategy(&self, name: &str, category: &str) -> Result<Strategy, JournalError> {
        if name.trim().is_empty() {
            return Err(JournalError::Validation(
                "strategy name must not be empty".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        let strategy = Strategy {
            id: Uuid::new_v4().to_string(),
            account_id: self.account_id.clone(),
            name: name.trim().to_string(),
            category: category.to_string(),
            created_at: now_millis(),
        };
        self.store.insert_strategy(&strategy).await?;
        state.strategies.push(strategy.clone());
        Ok(strategy)
    }

    /// Export the filtered trade history as CSV. Returns the suggested
    /// filename and the document contents.
    pub async fn export_trades(
        &self,
        filter: &TradeFilter,
    ) -> Result<(String, String), JournalError> {
        let state = self.state.lock().await;
        let today = today_utc();
        let filtered = filter.apply(&state.trades, today);
        let contents = export::trades_to_csv(&filtered)?;
        Ok((export::export_filename(filter, today), contents))
    }

    async fn write_balance(&self, current_balance: f64) -> Result<(), JournalError> {
        self.store
            .update_account_balance(
                &self.account_id,
                BalancePatch {
                    current_balance: Some(current_balance),
                    ..Default::default()
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{AccountKind, Direction, Outcome, Session};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn service_with(starting: f64) -> JournalService {
        let _ = env_logger::builder().is_test(true).try_init();
        let db = Arc::new(Database::open_in_memory().unwrap());
        JournalService::register(db, "trader@example.com", starting)
            .await
            .unwrap()
    }

    fn trade_input(result: f64, outcome: Outcome) -> CreateTradeInput {
        CreateTradeInput {
            date: date(2024, 2, 1),
            pair: "EURUSD".to_string(),
            session: Session::London,
            timeframe: "1hr".to_string(),
            direction: Direction::Long,
            sl_pips: 25.0,
            tp_pips: 50.0,
            outcome,
            result,
            account_kind: AccountKind::Live,
            strategy_name: None,
            image_link: None,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn test_trade_then_withdrawal_moves_balance() {
        let service = service_with(1000.0).await;

        let trade = service
            .add_trade(trade_input(150.25, Outcome::Win))
            .await
            .unwrap();
        assert_eq!(trade.balance_after_trade, 1150.25);
        assert_eq!(service.current_balance().await, 1150.25);

        let withdrawal = service
            .add_withdrawal(date(2024, 2, 2), 200.0, None)
            .await
            .unwrap();
        assert_eq!(withdrawal.balance_before, 1150.25);
        assert_eq!(withdrawal.balance_after, 950.25);
        assert_eq!(service.current_balance().await, 950.25);
    }

    #[tokio::test]
    async fn test_risk_reward_derived_from_pips() {
        let service = service_with(1000.0).await;
        let trade = service
            .add_trade(trade_input(75.0, Outcome::Win))
            .await
            .unwrap();
        assert_eq!(trade.risk_reward_ratio, 2.0);
    }

    #[tokio::test]
    async fn test_balance_equation_holds_across_mutations() {
        let service = service_with(1000.0).await;
        service.add_trade(trade_input(100.0, Outcome::Win)).await.unwrap();
        service.add_trade(trade_input(-40.0, Outcome::Loss)).await.unwrap();
        service.add_trade(trade_input(0.0, Outcome::BreakEven)).await.unwrap();
        service.add_withdrawal(date(2024, 2, 3), 50.0, None).await.unwrap();

        let snap = service.snapshot().await;
        let results: f64 = snap.trades.iter().map(|t| t.result).sum();
        let withdrawn: f64 = snap.withdrawals.iter().map(|w| w.amount).sum();
        assert_eq!(
            snap.account.current_balance,
            balance::round_cents(snap.account.starting_balance + results - withdrawn)
        );
        assert_eq!(snap.account.current_balance, 1010.0);
    }

    #[tokio::test]
    async fn test_add_delete_round_trip_restores_balance() {
        let service = service_with(1000.0).await;
        let before = service.current_balance().await;

        let trade = service
            .add_trade(trade_input(123.45, Outcome::Win))
            .await
            .unwrap();
        service.delete_trade(&trade.id).await.unwrap();
        assert!((service.current_balance().await - before).abs() < 0.01);

        let withdrawal = service
            .add_withdrawal(date(2024, 2, 2), 99.99, None)
            .await
            .unwrap();
        service.delete_withdrawal(&withdrawal.id).await.unwrap();
        assert!((service.current_balance().await - before).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_withdrawal_exceeding_balance_rejected_without_side_effects() {
        let service = service_with(500.0).await;
        let err = service
            .add_withdrawal(date(2024, 2, 2), 500.01, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "insufficient_balance");
        assert_eq!(service.current_balance().await, 500.0);
        assert!(service.snapshot().await.withdrawals.is_empty());

        // Withdrawing the exact balance is allowed.
        service.add_withdrawal(date(2024, 2, 2), 500.0, None).await.unwrap();
        assert_eq!(service.current_balance().await, 0.0);
    }

    #[tokio::test]
    async fn test_update_starting_balance_recomputes_current() {
        let service = service_with(1000.0).await;
        service.add_trade(trade_input(100.0, Outcome::Win)).await.unwrap();
        service.add_trade(trade_input(200.0, Outcome::Win)).await.unwrap();
        service.add_withdrawal(date(2024, 2, 2), 100.0, None).await.unwrap();

        let current = service.update_starting_balance(2000.0).await.unwrap();
        assert_eq!(current, 2200.0);

        let snap = service.snapshot().await;
        assert_eq!(snap.account.starting_balance, 2000.0);
        assert_eq!(snap.account.current_balance, 2200.0);
    }

    #[tokio::test]
    async fn test_update_starting_balance_validation() {
        let service = service_with(1000.0).await;
        assert!(service.update_starting_balance(-1.0).await.is_err());
        assert!(service.update_starting_balance(1_000_000_000.01).await.is_err());
        assert!(service.update_starting_balance(f64::NAN).await.is_err());
        // Bounds are inclusive.
        assert!(service.update_starting_balance(0.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_all_trades_resets_net_of_withdrawals() {
        let service = service_with(1000.0).await;
        service.add_trade(trade_input(300.0, Outcome::Win)).await.unwrap();
        service.add_withdrawal(date(2024, 2, 2), 100.0, None).await.unwrap();

        let removed = service.delete_all_trades().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(service.current_balance().await, 900.0);
        assert!(service.snapshot().await.trades.is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_withdrawals_returns_funds() {
        let service = service_with(1000.0).await;
        service.add_withdrawal(date(2024, 2, 1), 100.0, None).await.unwrap();
        service.add_withdrawal(date(2024, 2, 2), 50.0, None).await.unwrap();

        let removed = service.delete_all_withdrawals().await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(service.current_balance().await, 1000.0);
    }

    #[tokio::test]
    async fn test_add_trade_validation() {
        let service = service_with(1000.0).await;

        let mut input = trade_input(10.0, Outcome::Win);
        input.pair = "  ".to_string();
        assert_eq!(service.add_trade(input).await.unwrap_err().kind(), "validation");

        let mut input = trade_input(10.0, Outcome::Win);
        input.sl_pips = 0.0;
        assert_eq!(service.add_trade(input).await.unwrap_err().kind(), "validation");

        let mut input = trade_input(10.0, Outcome::Win);
        input.result = f64::NAN;
        assert_eq!(service.add_trade(input).await.unwrap_err().kind(), "validation");

        assert!(service.snapshot().await.trades.is_empty());
        assert_eq!(service.current_balance().await, 1000.0);
    }

    #[tokio::test]
    async fn test_delete_missing_entries() {
        let service = service_with(1000.0).await;
        assert_eq!(
            service.delete_trade("missing").await.unwrap_err().kind(),
            "not_found"
        );
        assert_eq!(
            service.delete_withdrawal("missing").await.unwrap_err().kind(),
            "not_found"
        );
    }

    #[tokio::test]
    async fn test_open_unknown_account_is_unauthenticated() {
        let db: Arc<dyn LedgerStore> = Arc::new(Database::open_in_memory().unwrap());
        let err = JournalService::open(db, "ghost").await.unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
    }

    #[tokio::test]
    async fn test_refresh_reloads_from_store() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = JournalService::register(db.clone(), "trader@example.com", 1000.0)
            .await
            .unwrap();
        service.add_trade(trade_input(50.0, Outcome::Win)).await.unwrap();

        // A second session against the same store sees the trade.
        let other = JournalService::open(db, service.account_id()).await.unwrap();
        assert_eq!(other.snapshot().await.trades.len(), 1);
        assert_eq!(other.current_balance().await, 1050.0);

        service.refresh().await.unwrap();
        assert_eq!(service.snapshot().await.trades.len(), 1);
    }

    /// Store wrapper whose final refresh fetch parks on a gate held by the
    /// test, so a mutation can be fired while a refresh is in flight.
    struct GatedStore {
        inner: Arc<Database>,
        gate: Arc<Mutex<()>>,
    }

    #[async_trait::async_trait]
    impl LedgerStore for GatedStore {
        async fn create_account(&self, account: &Account) -> Result<(), JournalError> {
            self.inner.create_account(account).await
        }
        async fn get_account(&self, account_id: &str) -> Result<Account, JournalError> {
            self.inner.get_account(account_id).await
        }
        async fn update_account_balance(
            &self,
            account_id: &str,
            patch: BalancePatch,
        ) -> Result<(), JournalError> {
            self.inner.update_account_balance(account_id, patch).await
        }
        async fn list_trades(&self, account_id: &str) -> Result<Vec<Trade>, JournalError> {
            self.inner.list_trades(account_id).await
        }
        async fn insert_trade(&self, trade: &Trade) -> Result<(), JournalError> {
            self.inner.insert_trade(trade).await
        }
        async fn delete_trade(&self, account_id: &str, trade_id: &str) -> Result<(), JournalError> {
            self.inner.delete_trade(account_id, trade_id).await
        }
        async fn delete_all_trades(&self, account_id: &str) -> Result<usize, JournalError> {
            self.inner.delete_all_trades(account_id).await
        }
        async fn list_withdrawals(&self, account_id: &str) -> Result<Vec<Withdrawal>, JournalError> {
            self.inner.list_withdrawals(account_id).await
        }
        async fn insert_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), JournalError> {
            self.inner.insert_withdrawal(withdrawal).await
        }
        async fn delete_withdrawal(
            &self,
            account_id: &str,
            withdrawal_id: &str,
        ) -> Result<(), JournalError> {
            self.inner.delete_withdrawal(account_id, withdrawal_id).await
        }
        async fn delete_all_withdrawals(&self, account_id: &str) -> Result<usize, JournalError> {
            self.inner.delete_all_withdrawals(account_id).await
        }
        async fn list_strategies(&self, account_id: &str) -> Result<Vec<Strategy>, JournalError> {
            let _open = self.gate.lock().await;
            self.inner.list_strategies(account_id).await
        }
        async fn insert_strategy(&self, strategy: &Strategy) -> Result<(), JournalError> {
            self.inner.insert_strategy(strategy).await
        }
    }

    #[tokio::test]
    async fn test_refresh_does_not_clobber_concurrent_mutation() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let seed = JournalService::register(db.clone(), "trader@example.com", 1000.0)
            .await
            .unwrap();
        let account_id = seed.account_id().to_string();
        drop(seed);

        let gate = Arc::new(Mutex::new(()));
        let store = Arc::new(GatedStore {
            inner: db.clone(),
            gate: gate.clone(),
        });
        let service = Arc::new(JournalService::open(store, &account_id).await.unwrap());

        // Park an in-flight refresh on its last store fetch.
        let held = gate.lock().await;
        let refresher = {
            let service = service.clone();
            tokio::spawn(async move { service.refresh().await })
        };
        tokio::task::yield_now().await;

        // Fire a mutation while the refresh is parked. It must wait for the
        // refresh instead of landing between its reads and its cache write.
        let writer = {
            let service = service.clone();
            tokio::spawn(async move { service.add_trade(trade_input(100.0, Outcome::Win)).await })
        };
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        drop(held);

        refresher.await.unwrap().unwrap();
        writer.await.unwrap().unwrap();

        let snap = service.snapshot().await;
        assert_eq!(snap.trades.len(), 1);
        assert_eq!(snap.account.current_balance, 1100.0);
        let stored = db.get_account(&account_id).await.unwrap();
        assert_eq!(stored.current_balance, 1100.0);
    }

    #[tokio::test]
    async fn test_duplicate_strategy_rejected() {
        let service = service_with(1000.0).await;
        service.add_strategy("Breakout", "live").await.unwrap();
        let err = service.add_strategy("Breakout", "live").await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn test_export_trades_respects_filter() {
        let service = service_with(1000.0).await;
        service.add_trade(trade_input(50.0, Outcome::Win)).await.unwrap();
        let mut other = trade_input(-20.0, Outcome::Loss);
        other.pair = "GBPJPY".to_string();
        service.add_trade(other).await.unwrap();

        let filter = TradeFilter {
            pair: Some("EURUSD".to_string()),
            ..Default::default()
        };
        let (name, csv) = service.export_trades(&filter).await.unwrap();
        assert!(name.starts_with("trade_history_AllTime_EURUSD_"));
        assert!(csv.contains("EURUSD"));
        assert!(!csv.contains("GBPJPY"));
    }
}
