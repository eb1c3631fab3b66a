//! Balance-derivation and analytics core for a personal trading journal.
//!
//! The crate is split along the seams a UI would consume it through:
//! `models` for the ledger rows, `store` for the persistence contract (with
//! a SQLite implementation in `db`), `balance` for the pure balance engine,
//! `filter`/`stats`/`export` for querying and aggregation, and `service`
//! for the session façade that keeps balance and ledger consistent under
//! mutation.

pub mod balance;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod models;
pub mod service;
pub mod stats;
pub mod store;

pub use error::JournalError;
pub use service::{JournalService, LedgerSnapshot};
