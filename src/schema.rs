//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! The DDL itself lives in `migrations/`.

/// Contacts table schema
pub mod contacts {
    /// Table name
    pub const TABLE: &str = "contacts";
    /// Primary key column
    pub const ID: &str = "id";
    /// Contact name column
    pub const NAME: &str = "name";
    /// Phone number column
    pub const PHONE: &str = "phone";
}

/// Ledger transactions table schema
pub mod transactions {
    /// Table name
    pub const TABLE: &str = "transactions";
    /// Primary key column
    pub const ID: &str = "id";
    /// Entry kind column (INCOME, EXPENSE, LOAN, BORROW, SAVINGS)
    pub const TYPE: &str = "type";
    /// Signed amount column
    pub const AMOUNT: &str = "amount";
    /// Description column
    pub const DESCRIPTION: &str = "description";
    /// Epoch milliseconds column
    pub const DATE: &str = "date";
    /// Category column
    pub const CATEGORY: &str = "category";
}

/// Loans table schema
pub mod loans {
    /// Table name
    pub const TABLE: &str = "loans";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to contacts table
    pub const CONTACT_ID: &str = "contact_id";
    /// Principal column
    pub const AMOUNT: &str = "amount";
    /// Amount still owed column
    pub const REMAINING_AMOUNT: &str = "remaining_amount";
    /// Direction column (GIVEN, TAKEN)
    pub const TYPE: &str = "type";
    /// Epoch milliseconds column
    pub const DATE: &str = "date";
    /// Repayment state column (PENDING, PARTIAL, COMPLETED)
    pub const STATUS: &str = "status";
    /// Interest rate in percent column
    pub const INTEREST_RATE: &str = "interest_rate";
    /// Computed interest column
    pub const INTEREST_AMOUNT: &str = "interest_amount";
    /// Principal plus interest column
    pub const TOTAL_AMOUNT: &str = "total_amount";
}
