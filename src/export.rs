//! CSV export of the filtered trade history.

use chrono::{Datelike, NaiveDate};
use csv::{Terminator, WriterBuilder};

use crate::error::JournalError;
use crate::filter::TradeFilter;
use crate::models::Trade;

const HEADER: [&str; 13] = [
    "Date",
    "Pair",
    "Direction",
    "SL Pips",
    "TP Pips",
    "RR",
    "Outcome",
    "Result",
    "Timeframe",
    "Account",
    "Strategy",
    "Image Link",
    "Remarks",
];

/// Render trades as a CSV document, one row per trade in the given order.
/// CRLF line endings so spreadsheet tools on every platform open it cleanly.
pub fn trades_to_csv(trades: &[Trade]) -> Result<String, JournalError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for trade in trades {
        writer.write_record([
            trade.date.format("%Y-%m-%d").to_string(),
            trade.pair.clone(),
            trade.direction.as_str().to_string(),
            format!("{}", trade.sl_pips),
            format!("{}", trade.tp_pips),
            format!("{:.2}", trade.risk_reward_ratio),
            trade.outcome.as_str().to_string(),
            format!("{:.2}", trade.result),
            trade.timeframe.clone(),
            trade.account_kind.as_str().to_string(),
            trade.strategy_name.clone().unwrap_or_default(),
            trade.image_link.clone().unwrap_or_default(),
            trade.remarks.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| JournalError::Persistence(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| JournalError::Persistence(e.to_string()))
}

/// Suggested filename for an export, reflecting the active filter. Each
/// criterion contributes a segment; unconstrained criteria fall back to an
/// "All" placeholder.
pub fn export_filename(filter: &TradeFilter, today: NaiveDate) -> String {
    let window = filter.resolve(today);
    let month = match (window.start, window.end) {
        (Some(start), Some(end)) if start.year() == end.year() && start.month() == end.month() => {
            start.format("%b%Y").to_string()
        }
        _ => "AllTime".to_string(),
    };

    format!(
        "trade_history_{}_{}_{}_{}_{}.csv",
        month,
        filter.pair.as_deref().unwrap_or("AllPairs"),
        filter.timeframe.as_deref().unwrap_or("AllTimeframes"),
        filter
            .account
            .map(|a| a.as_str())
            .unwrap_or("AllAccounts"),
        filter.strategy.as_deref().unwrap_or("AllStrategies"),
    )
}
