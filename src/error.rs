//! Error types for the finance-tracker library.
//!
//! This module provides custom error types using `thiserror`. Business-rule
//! rejections (insufficient balance, overpayment, ...) are ordinary variants so
//! callers can report them to the user without treating them as failures of the
//! store; see [`FinanceError::is_rejection`].

use thiserror::Error;

/// Errors that can occur in the finance-tracker application.
#[derive(Error, Debug)]
pub enum FinanceError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Contact not found
    #[error("Contact not found: {0}")]
    ContactNotFound(i64),

    /// Loan not found
    #[error("Loan not found: {0}")]
    LoanNotFound(i64),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(i64),

    /// Backup file not found
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// The current balance does not cover the requested amount
    #[error("Insufficient balance: available {available:.2}, requested {requested:.2}")]
    InsufficientBalance {
        /// Balance at the time of the check
        available: f64,
        /// Amount that was requested
        requested: f64,
    },

    /// The savings balance does not cover the requested withdrawal
    #[error("Insufficient savings: available {available:.2}, requested {requested:.2}")]
    InsufficientSavings {
        /// Savings balance at the time of the check
        available: f64,
        /// Amount that was requested
        requested: f64,
    },

    /// A repayment larger than what is still owed on the loan
    #[error("Payment of {payment:.2} exceeds the remaining amount {remaining:.2}")]
    PaymentExceedsRemaining {
        /// Amount still owed
        remaining: f64,
        /// Payment that was offered
        payment: f64,
    },

    /// Contact is still referenced by loans
    #[error("Contact {0} still has loans and cannot be removed")]
    ContactInUse(i64),

    /// A loan whose creation entry is missing from the transaction ledger
    #[error("Ledger entry for loan {0} not found")]
    MirroredEntryMissing(i64),

    /// Invalid monetary amount or rate
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl FinanceError {
    /// True for business-rule rejections that leave the store untouched and
    /// should be shown to the user rather than logged as failures.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::InsufficientSavings { .. }
                | Self::PaymentExceedsRemaining { .. }
                | Self::ContactInUse(_)
                | Self::InvalidAmount(_)
                | Self::InvalidInput(_)
        )
    }
}

/// Convenience type alias for Result with FinanceError
pub type Result<T> = std::result::Result<T, FinanceError>;

impl From<anyhow::Error> for FinanceError {
    fn from(err: anyhow::Error) -> Self {
        FinanceError::Other(err.to_string())
    }
}
