//! Aggregation engine. Every function is pure: it takes an immutable,
//! already-filtered snapshot and returns derived statistics. Empty inputs
//! produce zero values, never NaN or errors.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::balance::round_cents;
use crate::models::{Direction, Outcome, Trade, Withdrawal};

pub const DAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// `round(100 * wins / total)` with break-even trades counted in the
/// denominator only. Zero when the set is empty.
fn rate(wins: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        ((wins as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Headline dashboard numbers for a filtered trade set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    pub win_rate: u32,
    pub total_pl: f64,
    /// Total P&L as a percentage of the starting balance, 2 decimals.
    pub roi: f64,
    pub avg_result: f64,
}

pub fn summary(trades: &[Trade], starting_balance: f64) -> Summary {
    let total_trades = trades.len();
    let wins = trades.iter().filter(|t| t.outcome == Outcome::Win).count();
    let losses = trades.iter().filter(|t| t.outcome == Outcome::Loss).count();
    let breakevens = trades
        .iter()
        .filter(|t| t.outcome == Outcome::BreakEven)
        .count();
    let total_pl: f64 = trades.iter().map(|t| t.result).sum();
    let total_pl = round_cents(total_pl);
    let roi = if starting_balance == 0.0 {
        0.0
    } else {
        round_cents(total_pl / starting_balance * 100.0)
    };
    let avg_result = if total_trades == 0 {
        0.0
    } else {
        round_cents(total_pl / total_trades as f64)
    };

    Summary {
        total_trades,
        wins,
        losses,
        breakevens,
        win_rate: rate(wins, total_trades),
        total_pl,
        roi,
        avg_result,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancePoint {
    pub label: String,
    pub balance: f64,
}

/// Balance-history series, oldest first, starting at `(Start, startingBalance)`.
///
/// `replay` must be true for any filtered view: stored `balance_after_trade`
/// values reflect the full ledger at the time each trade occurred and only
/// make sense for the unfiltered default view. Replay accumulates the
/// filtered subset's results from the starting balance instead.
pub fn balance_history(starting_balance: f64, trades: &[Trade], replay: bool) -> Vec<BalancePoint> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.date);

    let mut points = Vec::with_capacity(ordered.len() + 1);
    points.push(BalancePoint {
        label: "Start".to_string(),
        balance: round_cents(starting_balance),
    });

    let mut running = starting_balance;
    for trade in ordered {
        let balance = if replay {
            running += trade.result;
            round_cents(running)
        } else {
            trade.balance_after_trade
        };
        points.push(BalancePoint {
            label: trade.date.format("%b %d").to_string(),
            balance,
        });
    }
    points
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinRatePoint {
    /// 1-based trade number in chronological order.
    pub trade_no: usize,
    pub win_rate: u32,
}

/// Running win rate after each trade in chronological order.
pub fn win_rate_over_time(trades: &[Trade]) -> Vec<WinRatePoint> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.date);

    let mut wins = 0usize;
    ordered
        .iter()
        .enumerate()
        .map(|(i, trade)| {
            if trade.outcome == Outcome::Win {
                wins += 1;
            }
            WinRatePoint {
                trade_no: i + 1,
                win_rate: rate(wins, i + 1),
            }
        })
        .collect()
}

/// Raw outcome counts. Zero-count categories are retained here; rendered
/// breakdowns drop them via `non_zero`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
}

impl OutcomeCounts {
    pub fn non_zero(&self) -> Vec<(&'static str, usize)> {
        [
            ("Win", self.wins),
            ("Loss", self.losses),
            ("Break Even", self.breakevens),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

pub fn outcome_distribution(trades: &[Trade]) -> OutcomeCounts {
    let mut counts = OutcomeCounts::default();
    for trade in trades {
        match trade.outcome {
            Outcome::Win => counts.wins += 1,
            Outcome::Loss => counts.losses += 1,
            Outcome::BreakEven => counts.breakevens += 1,
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DirectionCounts {
    pub long: usize,
    pub short: usize,
}

pub fn direction_distribution(trades: &[Trade]) -> DirectionCounts {
    let mut counts = DirectionCounts::default();
    for trade in trades {
        match trade.direction {
            Direction::Long => counts.long += 1,
            Direction::Short => counts.short += 1,
        }
    }
    counts
}

/// Win rate grouped by an arbitrary classification key (pair, strategy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupWinRate {
    pub key: String,
    pub win_rate: u32,
    pub trades: usize,
}

/// Group trades by `key` and rank by win rate, descending. Groups keep
/// their first-seen order under ties (stable sort), and trades without a
/// key are skipped. `limit` of `None` returns all groups.
pub fn top_by_win_rate<F>(trades: &[Trade], key: F, limit: Option<usize>) -> Vec<GroupWinRate>
where
    F: Fn(&Trade) -> Option<&str>,
{
    let mut groups: Vec<(String, usize, usize)> = Vec::new(); // (key, wins, total)
    for trade in trades {
        let Some(k) = key(trade) else { continue };
        let entry = match groups.iter_mut().find(|(name, _, _)| name == k) {
            Some(entry) => entry,
            None => {
                groups.push((k.to_string(), 0, 0));
                groups.last_mut().unwrap()
            }
        };
        if trade.outcome == Outcome::Win {
            entry.1 += 1;
        }
        entry.2 += 1;
    }

    let mut ranked: Vec<GroupWinRate> = groups
        .into_iter()
        .map(|(key, wins, total)| GroupWinRate {
            key,
            win_rate: rate(wins, total),
            trades: total,
        })
        .collect();
    ranked.sort_by(|a, b| b.win_rate.cmp(&a.win_rate));
    if let Some(n) = limit {
        ranked.truncate(n);
    }
    ranked
}

/// Per-pair win rate, descending. Operates on the date-range-only trade
/// set, not a pair-filtered one.
pub fn pair_win_rates(trades: &[Trade]) -> Vec<GroupWinRate> {
    top_by_win_rate(trades, |t| Some(t.pair.as_str()), None)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairPips {
    pub pair: String,
    pub avg_sl_pips: f64,
    pub avg_tp_pips: f64,
}

/// Mean SL/TP distance per pair, alphabetical.
pub fn pair_pip_averages(trades: &[Trade]) -> Vec<PairPips> {
    let mut groups: Vec<(String, f64, f64, usize)> = Vec::new();
    for trade in trades {
        let entry = match groups.iter_mut().find(|(pair, ..)| *pair == trade.pair) {
            Some(entry) => entry,
            None => {
                groups.push((trade.pair.clone(), 0.0, 0.0, 0));
                groups.last_mut().unwrap()
            }
        };
        entry.1 += trade.sl_pips;
        entry.2 += trade.tp_pips;
        entry.3 += 1;
    }

    let mut averages: Vec<PairPips> = groups
        .into_iter()
        .map(|(pair, sl, tp, count)| PairPips {
            pair,
            avg_sl_pips: round_cents(sl / count as f64),
            avg_tp_pips: round_cents(tp / count as f64),
        })
        .collect();
    averages.sort_by(|a, b| a.pair.cmp(&b.pair));
    averages
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairPnl {
    pub pair: String,
    /// Sum of non-negative results.
    pub profit: f64,
    /// Absolute sum of negative results.
    pub loss: f64,
}

/// Profit/loss split per pair, alphabetical.
pub fn pair_profit_loss(trades: &[Trade]) -> Vec<PairPnl> {
    let mut groups: Vec<PairPnl> = Vec::new();
    for trade in trades {
        let entry = match groups.iter_mut().find(|g| g.pair == trade.pair) {
            Some(entry) => entry,
            None => {
                groups.push(PairPnl {
                    pair: trade.pair.clone(),
                    profit: 0.0,
                    loss: 0.0,
                });
                groups.last_mut().unwrap()
            }
        };
        if trade.result >= 0.0 {
            entry.profit += trade.result;
        } else {
            entry.loss += trade.result.abs();
        }
    }
    for group in &mut groups {
        group.profit = round_cents(group.profit);
        group.loss = round_cents(group.loss);
    }
    groups.sort_by(|a, b| a.pair.cmp(&b.pair));
    groups
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWinRate {
    pub day: &'static str,
    pub win_rate: u32,
    pub trades: usize,
}

/// Win rate bucketed by calendar day of week. All seven buckets are always
/// present, Sun through Sat, 0% when empty.
pub fn day_of_week_win_rates(trades: &[Trade]) -> Vec<DayWinRate> {
    let mut wins = [0usize; 7];
    let mut totals = [0usize; 7];
    for trade in trades {
        let day = trade.date.weekday().num_days_from_sunday() as usize;
        if trade.outcome == Outcome::Win {
            wins[day] += 1;
        }
        totals[day] += 1;
    }

    DAY_LABELS
        .iter()
        .enumerate()
        .map(|(i, day)| DayWinRate {
            day,
            win_rate: rate(wins[i], totals[i]),
            trades: totals[i],
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Trade,
    Withdrawal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub date: NaiveDate,
    pub title: String,
    /// Signed display amount: `+result`/`-result` for trades, `-amount`
    /// for withdrawals.
    pub display_amount: String,
}

/// Trades and withdrawals merged into one feed, newest first, top `limit`.
pub fn recent_activity(
    trades: &[Trade],
    withdrawals: &[Withdrawal],
    limit: usize,
) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = Vec::with_capacity(trades.len() + withdrawals.len());

    for trade in trades {
        let sign = if trade.result > 0.0 { "+" } else { "" };
        entries.push(ActivityEntry {
            id: trade.id.clone(),
            kind: ActivityKind::Trade,
            date: trade.date,
            title: format!("{} {} trade", trade.pair, trade.direction.as_str()),
            display_amount: format!("{}{:.2}", sign, trade.result),
        });
    }
    for withdrawal in withdrawals {
        entries.push(ActivityEntry {
            id: withdrawal.id.clone(),
            kind: ActivityKind::Withdrawal,
            date: withdrawal.date,
            title: "Withdrawal".to_string(),
            display_amount: format!("-{:.2}", withdrawal.amount),
        });
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPnl {
    pub date: NaiveDate,
    pub pnl: f64,
    pub trades: usize,
}

/// Per-day P&L and trade counts for the calendar view, oldest first.
pub fn daily_pnl(trades: &[Trade]) -> Vec<DailyPnl> {
    let mut days: Vec<DailyPnl> = Vec::new();
    for trade in trades {
        let entry = match days.iter_mut().find(|d| d.date == trade.date) {
            Some(entry) => entry,
            None => {
                days.push(DailyPnl {
                    date: trade.date,
                    pnl: 0.0,
                    trades: 0,
                });
                days.last_mut().unwrap()
            }
        };
        entry.pnl += trade.result;
        entry.trades += 1;
    }
    for day in &mut days {
        day.pnl = round_cents(day.pnl);
    }
    days.sort_by_key(|d| d.date);
    days
}
