//! `LedgerStore` implementation over the SQLite connection.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Type;
use std::sync::MutexGuard;

use crate::db::Database;
use crate::error::JournalError;
use crate::models::{Account, AccountKind, Direction, Outcome, Session, Strategy, Trade, Withdrawal};
use crate::store::{BalancePatch, LedgerStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(value: String, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_tag<T>(value: String, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unrecognized value: {}", value).into(),
        )
    })
}

fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: parse_date(row.get(2)?, 2)?,
        pair: row.get(3)?,
        session: parse_tag(row.get(4)?, 4, Session::parse)?,
        timeframe: row.get(5)?,
        direction: parse_tag(row.get(6)?, 6, Direction::parse)?,
        sl_pips: row.get(7)?,
        tp_pips: row.get(8)?,
        risk_reward_ratio: row.get(9)?,
        outcome: parse_tag(row.get(10)?, 10, Outcome::parse)?,
        result: row.get(11)?,
        balance_after_trade: row.get(12)?,
        account_kind: parse_tag(row.get(13)?, 13, AccountKind::parse)?,
        strategy_name: row.get(14)?,
        image_link: row.get(15)?,
        remarks: row.get(16)?,
        created_at: row.get(17)?,
    })
}

fn map_row_to_withdrawal(row: &rusqlite::Row) -> rusqlite::Result<Withdrawal> {
    Ok(Withdrawal {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: parse_date(row.get(2)?, 2)?,
        amount: row.get(3)?,
        balance_before: row.get(4)?,
        balance_after: row.get(5)?,
        remarks: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        email: row.get(1)?,
        starting_balance: row.get(2)?,
        current_balance: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_row_to_strategy(row: &rusqlite::Row) -> rusqlite::Result<Strategy> {
    Ok(Strategy {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    fn lock(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, JournalError> {
        self.conn
            .lock()
            .map_err(|e| JournalError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn create_account(&self, account: &Account) -> Result<(), JournalError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO accounts (id, email, starting_balance, current_balance, created_at)
             VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![
                account.id,
                account.email,
                account.starting_balance,
                account.current_balance,
                account.created_at
            ],
        )?;
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> Result<Account, JournalError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, email, starting_balance, current_balance, created_at
             FROM accounts WHERE id = ?",
            [account_id],
            map_row_to_account,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => JournalError::NotFound("account".to_string()),
            other => other.into(),
        })
    }

    async fn update_account_balance(
        &self,
        account_id: &str,
        patch: BalancePatch,
    ) -> Result<(), JournalError> {
        let mut updates = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(val) = patch.starting_balance {
            updates.push("starting_balance = ?");
            values.push(Box::new(val));
        }
        if let Some(val) = patch.current_balance {
            updates.push("current_balance = ?");
            values.push(Box::new(val));
        }
        if updates.is_empty() {
            return Ok(());
        }

        let conn = self.lock()?;
        let query = format!("UPDATE accounts SET {} WHERE id = ?", updates.join(", "));
        values.push(Box::new(account_id.to_string()));

        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let affected = conn.execute(&query, params.as_slice())?;
        if affected == 0 {
            return Err(JournalError::NotFound("account".to_string()));
        }
        Ok(())
    }

    async fn list_trades(&self, account_id: &str) -> Result<Vec<Trade>, JournalError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, date, pair, session, timeframe, direction, sl_pips, tp_pips,
                    risk_reward_ratio, outcome, result, balance_after_trade, account_kind,
                    strategy_name, image_link, remarks, created_at
             FROM trades WHERE account_id = ?
             ORDER BY date DESC, created_at DESC",
        )?;
        let rows = stmt.query_map([account_id], map_row_to_trade)?;
        let trades: Result<Vec<Trade>, _> = rows.collect();
        Ok(trades?)
    }

    async fn insert_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO trades (
                id, account_id, date, pair, session, timeframe, direction, sl_pips, tp_pips,
                risk_reward_ratio, outcome, result, balance_after_trade, account_kind,
                strategy_name, image_link, remarks, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                trade.id,
                trade.account_id,
                trade.date.format(DATE_FORMAT).to_string(),
                trade.pair,
                trade.session.as_str(),
                trade.timeframe,
                trade.direction.as_str(),
                trade.sl_pips,
                trade.tp_pips,
                trade.risk_reward_ratio,
                trade.outcome.as_str(),
                trade.result,
                trade.balance_after_trade,
                trade.account_kind.as_str(),
                trade.strategy_name,
                trade.image_link,
                trade.remarks,
                trade.created_at
            ],
        )?;
        Ok(())
    }

    async fn delete_trade(&self, account_id: &str, trade_id: &str) -> Result<(), JournalError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM trades WHERE id = ? AND account_id = ?",
            [trade_id, account_id],
        )?;
        if affected == 0 {
            return Err(JournalError::NotFound("trade".to_string()));
        }
        Ok(())
    }

    async fn delete_all_trades(&self, account_id: &str) -> Result<usize, JournalError> {
        let conn = self.lock()?;
        let count = conn.execute("DELETE FROM trades WHERE account_id = ?", [account_id])?;
        Ok(count)
    }

    async fn list_withdrawals(&self, account_id: &str) -> Result<Vec<Withdrawal>, JournalError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, date, amount, balance_before, balance_after, remarks, created_at
             FROM withdrawals WHERE account_id = ?
             ORDER BY date DESC, created_at DESC",
        )?;
        let rows = stmt.query_map([account_id], map_row_to_withdrawal)?;
        let withdrawals: Result<Vec<Withdrawal>, _> = rows.collect();
        Ok(withdrawals?)
    }

    async fn insert_withdrawal(&self, withdrawal: &Withdrawal) -> Result<(), JournalError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO withdrawals (
                id, account_id, date, amount, balance_before, balance_after, remarks, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                withdrawal.id,
                withdrawal.account_id,
                withdrawal.date.format(DATE_FORMAT).to_string(),
                withdrawal.amount,
                withdrawal.balance_before,
                withdrawal.balance_after,
                withdrawal.remarks,
                withdrawal.created_at
            ],
        )?;
        Ok(())
    }

    async fn delete_withdrawal(
        &self,
        account_id: &str,
        withdrawal_id: &str,
    ) -> Result<(), JournalError> {
        let conn = self.lock()?;
        let affected = conn.execute(
            "DELETE FROM withdrawals WHERE id = ? AND account_id = ?",
            [withdrawal_id, account_id],
        )?;
        if affected == 0 {
            return Err(JournalError::NotFound("withdrawal".to_string()));
        }
        Ok(())
    }

    async fn delete_all_withdrawals(&self, account_id: &str) -> Result<usize, JournalError> {
        let conn = self.lock()?;
        let count = conn.execute("DELETE FROM withdrawals WHERE account_id = ?", [account_id])?;
        Ok(count)
    }

    async fn list_strategies(&self, account_id: &str) -> Result<Vec<Strategy>, JournalError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, name, category, created_at
             FROM strategies WHERE account_id = ?
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([account_id], map_row_to_strategy)?;
        let strategies: Result<Vec<Strategy>, _> = rows.collect();
        Ok(strategies?)
    }

    async fn insert_strategy(&self, strategy: &Strategy) -> Result<(), JournalError> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO strategies (id, account_id, name, category, created_at)
             VALUES (?, ?, ?, ?, ?)",
            rusqlite::params![
                strategy.id,
                strategy.account_id,
                strategy.name,
                strategy.category,
                strategy.created_at
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(JournalError::Validation(format!(
                    "strategy '{}' already exists",
                    strategy.name
                )))
            }
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn account(id: &str) -> Account {
        Account {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            starting_balance: 1000.0,
            current_balance: 1000.0,
            created_at: 0,
        }
    }

    fn trade(id: &str, account_id: &str, ymd: NaiveDate, created_at: i64) -> Trade {
        Trade {
            id: id.to_string(),
            account_id: account_id.to_string(),
            date: ymd,
            pair: "EURUSD".to_string(),
            session: Session::NewYork,
            timeframe: "4hr".to_string(),
            direction: Direction::Short,
            sl_pips: 25.0,
            tp_pips: 50.0,
            risk_reward_ratio: 2.0,
            outcome: Outcome::Win,
            result: 75.0,
            balance_after_trade: 1075.0,
            account_kind: AccountKind::Live,
            strategy_name: Some("Breakout".to_string()),
            image_link: None,
            remarks: Some("clean entry".to_string()),
            created_at,
        }
    }

    fn withdrawal(id: &str, account_id: &str, ymd: NaiveDate) -> Withdrawal {
        Withdrawal {
            id: id.to_string(),
            account_id: account_id.to_string(),
            date: ymd,
            amount: 100.0,
            balance_before: 1075.0,
            balance_after: 975.0,
            remarks: None,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn test_trade_round_trip_preserves_fields() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        db.insert_trade(&trade("t1", "a1", date(2024, 2, 1), 1)).await.unwrap();

        let trades = db.list_trades("a1").await.unwrap();
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.date, date(2024, 2, 1));
        assert_eq!(t.session, Session::NewYork);
        assert_eq!(t.direction, Direction::Short);
        assert_eq!(t.outcome, Outcome::Win);
        assert_eq!(t.account_kind, AccountKind::Live);
        assert_eq!(t.strategy_name.as_deref(), Some("Breakout"));
    }

    #[tokio::test]
    async fn test_list_trades_most_recent_first() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        db.insert_trade(&trade("t1", "a1", date(2024, 2, 1), 1)).await.unwrap();
        db.insert_trade(&trade("t2", "a1", date(2024, 2, 5), 2)).await.unwrap();
        db.insert_trade(&trade("t3", "a1", date(2024, 2, 3), 3)).await.unwrap();

        let ids: Vec<String> = db
            .list_trades("a1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["t2", "t3", "t1"]);
    }

    #[tokio::test]
    async fn test_rows_scoped_to_account() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        db.create_account(&account("a2")).await.unwrap();
        db.insert_trade(&trade("t1", "a1", date(2024, 2, 1), 1)).await.unwrap();

        assert_eq!(db.list_trades("a2").await.unwrap().len(), 0);
        let err = db.delete_trade("a2", "t1").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
        // Still present for its owner.
        assert_eq!(db.list_trades("a1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_trade_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        let err = db.delete_trade("a1", "missing").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_balance_patch_partial_update() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();

        db.update_account_balance(
            "a1",
            BalancePatch {
                current_balance: Some(1234.56),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let acct = db.get_account("a1").await.unwrap();
        assert_eq!(acct.current_balance, 1234.56);
        assert_eq!(acct.starting_balance, 1000.0);
    }

    #[tokio::test]
    async fn test_get_missing_account() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_account("ghost").await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn test_withdrawal_round_trip_and_bulk_delete() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        db.insert_withdrawal(&withdrawal("w1", "a1", date(2024, 2, 2))).await.unwrap();
        db.insert_withdrawal(&withdrawal("w2", "a1", date(2024, 2, 4))).await.unwrap();

        let listed = db.list_withdrawals("a1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "w2");
        assert_eq!(listed[0].balance_before, 1075.0);

        assert_eq!(db.delete_all_withdrawals("a1").await.unwrap(), 2);
        assert!(db.list_withdrawals("a1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_strategy_name_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_account(&account("a1")).await.unwrap();
        let strategy = Strategy {
            id: "s1".to_string(),
            account_id: "a1".to_string(),
            name: "Breakout".to_string(),
            category: "backtest".to_string(),
            created_at: 0,
        };
        db.insert_strategy(&strategy).await.unwrap();

        let dup = Strategy {
            id: "s2".to_string(),
            ..strategy
        };
        let err = db.insert_strategy(&dup).await.unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
