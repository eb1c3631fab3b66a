use thiserror::Error;

/// Error taxonomy for all public journal operations. Validation errors are
/// raised before any mutation; persistence failures abort the operation
/// before the in-memory model is touched.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Withdrawal amount {requested:.2} exceeds current balance {available:.2}")]
    InsufficientBalance { requested: f64, available: f64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("No authenticated account")]
    Unauthenticated,

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Partial failure, manual reconciliation required: {0}")]
    Partial(String),
}

impl JournalError {
    /// Stable discriminant for programmatic handling at the UI boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            JournalError::Validation(_) => "validation",
            JournalError::InsufficientBalance { .. } => "insufficient_balance",
            JournalError::NotFound(_) => "not_found",
            JournalError::Unauthenticated => "unauthenticated",
            JournalError::Persistence(_) => "persistence",
            JournalError::Partial(_) => "partial",
        }
    }
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        JournalError::Persistence(err.to_string())
    }
}

impl From<csv::Error> for JournalError {
    fn from(err: csv::Error) -> Self {
        JournalError::Persistence(err.to_string())
    }
}
