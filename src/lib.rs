//! Finance Tracker - Personal Ledger, Savings and Loans
//!
//! A Rust library for keeping a local, single-user finance ledger in SQLite.
//!
//! # Features
//!
//! - Income, expense and savings transactions with balance checks
//! - Interest-bearing loans with mirrored ledger entries
//! - Contact book with search, pagination and phone-number import
//! - Period statistics and spending recommendations
//! - JSON backup/restore and CSV/JSON reports

/// JSON backup and restore
pub mod backup;
/// Configuration management
pub mod config;
/// Contact book
pub mod contacts;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Transaction report export
pub mod file_writer;
/// Logging setup and utilities
pub mod logging;
/// Loan ledger
pub mod loans;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// SQL access to the ledger tables
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Statistics and recommendations
pub mod statistics;
/// Transaction ledger
pub mod transactions;
/// Clock, dates and phone helpers
pub mod utils;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use backup::{BackupService, BackupSnapshot};
pub use contacts::ContactService;
pub use db::Database;
pub use error::{FinanceError, Result};
pub use loans::LoanLedger;
pub use metrics::MetricsCollector;
pub use models::{Contact, Loan, LoanStatus, LoanType, Transaction, TransactionType};
pub use statistics::StatisticsService;
pub use transactions::TransactionLedger;
