//! Declarative filter criteria resolved into a predicate over ledger
//! entries before aggregation. Dates are calendar days compared in UTC;
//! time-of-day never shifts an entry across a day boundary.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AccountKind, Trade, Withdrawal};

/// Named relative window resolved against "today" at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickRange {
    All,
    Week,
    Month,
    Quarter,
    Year,
}

impl QuickRange {
    fn days_back(&self) -> Option<u64> {
        match self {
            QuickRange::All => None,
            QuickRange::Week => Some(7),
            QuickRange::Month => Some(30),
            QuickRange::Quarter => Some(90),
            QuickRange::Year => Some(365),
        }
    }
}

/// Resolved `[start, end]` window. Absent bounds impose no constraint on
/// that side; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}

/// The date component of a filter: either a quick-range keyword or an
/// explicit range with optional bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DateSelection {
    Quick { quick: QuickRange },
    Range {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl Default for DateSelection {
    fn default() -> Self {
        DateSelection::Quick { quick: QuickRange::All }
    }
}

/// Filter criteria for ledger queries. Categorical fields use `None` for
/// "all"; present values are exact matches, ANDed with the date predicate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilter {
    #[serde(default)]
    pub date: DateSelection,
    pub pair: Option<String>,
    pub timeframe: Option<String>,
    pub account: Option<AccountKind>,
    pub strategy: Option<String>,
}

impl TradeFilter {
    /// Resolve the date component into a concrete window. Quick ranges end
    /// at `today`.
    pub fn resolve(&self, today: NaiveDate) -> DateWindow {
        match self.date {
            DateSelection::Quick { quick } => match quick.days_back() {
                None => DateWindow::default(),
                Some(days) => DateWindow {
                    start: today.checked_sub_days(Days::new(days)),
                    end: Some(today),
                },
            },
            DateSelection::Range { start, end } => DateWindow { start, end },
        }
    }

    pub fn matches(&self, trade: &Trade, today: NaiveDate) -> bool {
        if !self.resolve(today).contains(trade.date) {
            return false;
        }
        if let Some(pair) = &self.pair {
            if trade.pair != *pair {
                return false;
            }
        }
        if let Some(timeframe) = &self.timeframe {
            if trade.timeframe != *timeframe {
                return false;
            }
        }
        if let Some(account) = self.account {
            if trade.account_kind != account {
                return false;
            }
        }
        if let Some(strategy) = &self.strategy {
            if trade.strategy_name.as_deref() != Some(strategy.as_str()) {
                return false;
            }
        }
        true
    }

    /// Withdrawals carry no categorical attributes; only the date window
    /// applies.
    pub fn matches_withdrawal(&self, withdrawal: &Withdrawal, today: NaiveDate) -> bool {
        self.resolve(today).contains(withdrawal.date)
    }

    /// True when no criterion constrains the ledger. The unfiltered view is
    /// the only one allowed to use stored per-trade balances.
    pub fn is_unfiltered(&self) -> bool {
        matches!(self.date, DateSelection::Quick { quick: QuickRange::All })
            && self.pair.is_none()
            && self.timeframe.is_none()
            && self.account.is_none()
            && self.strategy.is_none()
    }

    /// Materialize the filtered subset as an owned snapshot for the
    /// aggregation engine.
    pub fn apply(&self, trades: &[Trade], today: NaiveDate) -> Vec<Trade> {
        trades
            .iter()
            .filter(|t| self.matches(t, today))
            .cloned()
            .collect()
    }

    pub fn apply_withdrawals(&self, withdrawals: &[Withdrawal], today: NaiveDate) -> Vec<Withdrawal> {
        withdrawals
            .iter()
            .filter(|w| self.matches_withdrawal(w, today))
            .cloned()
            .collect()
    }
}

/// Today as a UTC calendar day. Storage and comparison share this single
/// timezone.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
