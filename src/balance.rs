//! Balance engine: pure arithmetic over the account balance. The full
//! trade/withdrawal ledgers are passed in as parameters; persistence and
//! in-memory bookkeeping are the service layer's job.

use crate::error::JournalError;
use crate::models::{Trade, Withdrawal};

/// Round half-up to cents. Applied at every persistence point so drift
/// cannot accumulate across many small trades.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ensure_finite(value: f64, what: &str) -> Result<(), JournalError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(JournalError::Validation(format!("{} must be a finite number", what)))
    }
}

/// New balance after recording a trade result (signed).
pub fn apply_trade_result(current_balance: f64, result: f64) -> Result<f64, JournalError> {
    ensure_finite(result, "trade result")?;
    Ok(round_cents(current_balance + result))
}

/// New balance after removing a trade from the ledger. A profitable trade
/// subtracts its result; a losing trade adds it back.
pub fn reverse_trade_result(current_balance: f64, result: f64) -> Result<f64, JournalError> {
    ensure_finite(result, "trade result")?;
    Ok(round_cents(current_balance - result))
}

/// Balance snapshots captured at the instant a withdrawal is made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalSnapshot {
    pub balance_before: f64,
    pub balance_after: f64,
}

/// Deduct a withdrawal. Fails with `InsufficientBalance` when the amount
/// exceeds the current balance; a withdrawal of exactly the balance is
/// allowed and leaves the account at zero.
pub fn apply_withdrawal(
    current_balance: f64,
    amount: f64,
) -> Result<WithdrawalSnapshot, JournalError> {
    ensure_finite(amount, "withdrawal amount")?;
    if amount <= 0.0 {
        return Err(JournalError::Validation(
            "withdrawal amount must be positive".to_string(),
        ));
    }
    let balance_before = round_cents(current_balance);
    let amount = round_cents(amount);
    if amount > balance_before {
        return Err(JournalError::InsufficientBalance {
            requested: amount,
            available: balance_before,
        });
    }
    Ok(WithdrawalSnapshot {
        balance_before,
        balance_after: round_cents(balance_before - amount),
    })
}

/// Add a deleted withdrawal's amount back into the balance.
pub fn reverse_withdrawal(current_balance: f64, amount: f64) -> Result<f64, JournalError> {
    ensure_finite(amount, "withdrawal amount")?;
    Ok(round_cents(current_balance + amount))
}

/// Full recomputation from scratch over the entire (unfiltered) ledger.
/// The only operation that ignores incremental deltas; required whenever
/// the starting balance is redefined retroactively.
pub fn recalculate_from_starting(
    new_starting_balance: f64,
    trades: &[Trade],
    withdrawals: &[Withdrawal],
) -> f64 {
    let total_results: f64 = trades.iter().map(|t| t.result).sum();
    let total_withdrawn: f64 = withdrawals.iter().map(|w| w.amount).sum();
    round_cents(new_starting_balance + total_results - total_withdrawn)
}
