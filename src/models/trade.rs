use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "win")]
    Win,
    #[serde(rename = "loss")]
    Loss,
    #[serde(rename = "BE")]
    BreakEven,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::BreakEven => "BE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "win" => Some(Outcome::Win),
            "loss" => Some(Outcome::Loss),
            "BE" => Some(Outcome::BreakEven),
            _ => None,
        }
    }
}

/// Trading session the entry was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    London,
    #[serde(rename = "New York")]
    NewYork,
    Tokyo,
    Sydney,
    Overlap,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::London => "London",
            Session::NewYork => "New York",
            Session::Tokyo => "Tokyo",
            Session::Sydney => "Sydney",
            Session::Overlap => "Overlap",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "London" => Some(Session::London),
            "New York" => Some(Session::NewYork),
            "Tokyo" => Some(Session::Tokyo),
            "Sydney" => Some(Session::Sydney),
            "Overlap" => Some(Session::Overlap),
            _ => None,
        }
    }
}

/// Whether the trade was taken on the live account or in a backtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Live,
    Backtest,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Live => "Live",
            AccountKind::Backtest => "Backtest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Live" => Some(AccountKind::Live),
            "Backtest" => Some(AccountKind::Backtest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub pair: String,
    pub session: Session,
    pub timeframe: String,
    pub direction: Direction,
    pub sl_pips: f64,
    pub tp_pips: f64,
    /// Derived at creation: tp_pips / sl_pips.
    pub risk_reward_ratio: f64,
    pub outcome: Outcome,
    /// Signed monetary result. The field of record for balance math,
    /// regardless of the outcome label.
    pub result: f64,
    /// Balance snapshot taken against the full ledger when the trade was
    /// recorded. Only meaningful for the unfiltered balance history.
    pub balance_after_trade: f64,
    #[serde(rename = "account")]
    pub account_kind: AccountKind,
    /// Weak reference to Strategy.name by value. Renaming or deleting a
    /// strategy leaves historical trades untouched.
    pub strategy_name: Option<String>,
    pub image_link: Option<String>,
    pub remarks: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTradeInput {
    pub date: NaiveDate,
    pub pair: String,
    pub session: Session,
    pub timeframe: String,
    pub direction: Direction,
    pub sl_pips: f64,
    pub tp_pips: f64,
    pub outcome: Outcome,
    pub result: f64,
    #[serde(rename = "account")]
    pub account_kind: AccountKind,
    pub strategy_name: Option<String>,
    pub image_link: Option<String>,
    pub remarks: Option<String>,
}
