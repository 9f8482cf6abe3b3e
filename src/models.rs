//! Data models for the ledger
//!
//! This module contains all data structures used throughout the application:
//! contacts, ledger transactions, loans, statistics results and user settings.
//! Field names serialize in camelCase so backups keep the same JSON shape as
//! the rows they were taken from.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::FinanceError;

/// Half a cent; money differences below this are rounding noise
pub const MONEY_EPSILON: f64 = 0.005;

/// Well-known transaction categories
pub mod categories {
    /// Category of the mirrored expense written when a loan is given
    pub const LOANS_GIVEN: &str = "Loans given";
    /// Category of the mirrored income written when a loan is taken
    pub const LOANS_TAKEN: &str = "Loans taken";
    /// Category of the mirrored income written when a given loan is repaid
    pub const REPAYMENTS_RECEIVED: &str = "Repayments received";
    /// Category of the mirrored expense written when a taken loan is repaid
    pub const REPAYMENTS_MADE: &str = "Repayments made";
    /// Category of a savings withdrawal (negative SAVINGS row)
    pub const SAVINGS_WITHDRAWAL: &str = "Savings withdrawal";
    /// Fallback used when a transaction has no category
    pub const OTHER: &str = "Other";

    /// Suggested income categories
    pub const INCOME: &[&str] = &["Salary", "Bonus", "Freelance", OTHER];
    /// Suggested expense categories
    pub const EXPENSE: &[&str] = &["Food", "Transport", "Housing", "Leisure", OTHER];
    /// Suggested savings categories
    pub const SAVINGS: &[&str] = &["General savings", "Specific project", "Retirement", OTHER];
}

/// Implements string conversion and SQLite (de)serialization for a unit enum
/// stored as its upper-case name.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Upper-case name stored in the database
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = FinanceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(FinanceError::InvalidInput(format!(
                        "unknown {}: {other}",
                        stringify!($ty)
                    ))),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: FinanceError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
    /// Legacy loan entry, ignored by the balance
    Loan,
    /// Legacy borrow entry, ignored by the balance
    Borrow,
    /// Money moved to (positive) or from (negative) savings
    Savings,
}

text_enum!(TransactionType {
    Income => "INCOME",
    Expense => "EXPENSE",
    Loan => "LOAN",
    Borrow => "BORROW",
    Savings => "SAVINGS",
});

/// Direction of a loan, seen from the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    /// The user lent money to the contact
    Given,
    /// The user borrowed money from the contact
    Taken,
}

text_enum!(LoanType {
    Given => "GIVEN",
    Taken => "TAKEN",
});

/// Repayment state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Nothing repaid yet
    Pending,
    /// Partially repaid
    Partial,
    /// Fully repaid, terminal
    Completed,
}

text_enum!(LoanStatus {
    Pending => "PENDING",
    Partial => "PARTIAL",
    Completed => "COMPLETED",
});

impl LoanStatus {
    /// Status implied by what is still owed on a loan of `total_amount`.
    #[must_use]
    pub fn from_remaining(remaining_amount: f64, total_amount: f64) -> Self {
        if remaining_amount <= 0.0 {
            Self::Completed
        } else if remaining_amount < total_amount {
            Self::Partial
        } else {
            Self::Pending
        }
    }
}

/// A person money is lent to or borrowed from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Database primary key
    pub id: i64,
    /// Display name
    pub name: String,
    /// Phone number (optional)
    #[serde(default)]
    pub phone: Option<String>,
}

impl Contact {
    /// True if a phone number is recorded
    #[must_use]
    pub fn has_phone_number(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Data for creating a new contact
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    /// Display name
    pub name: String,
    /// Phone number (optional)
    pub phone: Option<String>,
}

/// A page of contacts together with the total row count
#[derive(Debug, Clone)]
pub struct ContactPage {
    /// Contacts on this page
    pub contacts: Vec<Contact>,
    /// Total number of stored contacts
    pub total: usize,
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Database primary key
    pub id: i64,
    /// Entry kind
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Amount; negative only for savings withdrawals
    pub amount: f64,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Epoch milliseconds
    pub date: i64,
    /// Category (optional)
    #[serde(default)]
    pub category: Option<String>,
}

impl Transaction {
    /// True for EXPENSE entries
    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.tx_type == TransactionType::Expense
    }

    /// True for INCOME entries
    #[must_use]
    pub fn is_income(&self) -> bool {
        self.tx_type == TransactionType::Income
    }

    /// True for SAVINGS entries, deposits and withdrawals alike
    #[must_use]
    pub fn is_savings(&self) -> bool {
        self.tx_type == TransactionType::Savings
    }

    /// True for the legacy LOAN / BORROW entries
    #[must_use]
    pub fn is_loan_related(&self) -> bool {
        matches!(self.tx_type, TransactionType::Loan | TransactionType::Borrow)
    }
}

/// Data for creating a new ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Entry kind
    pub tx_type: TransactionType,
    /// Amount; negative only for savings withdrawals
    pub amount: f64,
    /// Free-form description
    pub description: String,
    /// Epoch milliseconds
    pub date: i64,
    /// Category (optional)
    pub category: Option<String>,
}

/// An interest-bearing loan between the user and a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Database primary key
    pub id: i64,
    /// Foreign key to the contacts table
    pub contact_id: i64,
    /// Principal
    pub amount: f64,
    /// Direction
    #[serde(rename = "type")]
    pub loan_type: LoanType,
    /// Epoch milliseconds
    pub date: i64,
    /// Repayment state
    pub status: LoanStatus,
    /// Interest rate in percent
    pub interest_rate: f64,
    /// `amount * interest_rate / 100`
    pub interest_amount: f64,
    /// `amount + interest_amount`
    pub total_amount: f64,
    /// Principal plus interest still owed
    pub remaining_amount: f64,
}

impl Loan {
    /// Interest owed on `amount` at `rate` percent.
    #[must_use]
    pub fn interest_for(amount: f64, rate: f64) -> f64 {
        amount * rate / 100.0
    }

    /// True if the user lent the money
    #[must_use]
    pub fn is_given(&self) -> bool {
        self.loan_type == LoanType::Given
    }

    /// True if the user borrowed the money
    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.loan_type == LoanType::Taken
    }

    /// True once nothing is owed anymore
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == LoanStatus::Completed
    }

    /// Share of the total already repaid, in percent.
    #[must_use]
    pub fn repayment_percentage(&self) -> f64 {
        if self.total_amount == 0.0 {
            return 0.0;
        }
        (self.total_amount - self.remaining_amount) / self.total_amount * 100.0
    }

    /// Advisory flag: barely repaid (< 10%) or exactly half way.
    #[must_use]
    pub fn needs_alert(&self) -> bool {
        let percentage = self.repayment_percentage();
        percentage < 10.0 || percentage == 50.0
    }

    /// Remaining amount after `payment`, never below zero.
    ///
    /// A leftover smaller than [`MONEY_EPSILON`] counts as settled.
    #[must_use]
    pub fn remaining_after(&self, payment: f64) -> f64 {
        if self.is_paid_in_full(payment) {
            0.0
        } else {
            self.remaining_amount - payment
        }
    }

    /// True if `payment` settles the loan, to within half a cent
    #[must_use]
    pub fn is_paid_in_full(&self, payment: f64) -> bool {
        payment >= self.remaining_amount - MONEY_EPSILON
    }

    /// True if `payment` is more than what is still owed.
    ///
    /// Nothing more can be paid on a completed loan.
    #[must_use]
    pub fn exceeds_remaining(&self, payment: f64) -> bool {
        self.is_completed() || payment > self.remaining_amount + MONEY_EPSILON
    }
}

/// Data for creating a new loan
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    /// Foreign key to the contacts table
    pub contact_id: i64,
    /// Principal
    pub amount: f64,
    /// Direction
    pub loan_type: LoanType,
    /// Epoch milliseconds
    pub date: i64,
    /// Interest rate in percent
    pub interest_rate: f64,
}

/// Editable terms of an existing loan
#[derive(Debug, Clone, PartialEq)]
pub struct LoanChanges {
    /// New counterpart
    pub contact_id: i64,
    /// New principal
    pub amount: f64,
    /// New interest rate in percent
    pub interest_rate: f64,
}

/// Loan totals for one contact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactLoanSummary {
    /// Principal lent to the contact
    pub total_given: f64,
    /// Principal borrowed from the contact
    pub total_taken: f64,
    /// Still owed by the contact
    pub outstanding_given: f64,
    /// Still owed to the contact
    pub outstanding_taken: f64,
}

/// Sums of one transaction type over trailing windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    /// Last 24 hours
    pub daily: f64,
    /// Last 7 days
    pub weekly: f64,
    /// Last 30 days
    pub monthly: f64,
    /// Last 365 days
    pub yearly: f64,
}

/// Expense total for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// Category name
    pub category: String,
    /// Sum of amounts
    pub amount: f64,
}

/// What a recommendation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Spending ratio bucket
    Spending,
    /// One category dominates spending
    Category,
    /// Savings ratio
    Savings,
    /// Three-month spending trend
    Trend,
}

/// How a recommendation should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Good news
    Success,
    /// Informational goal
    Info,
    /// Needs attention
    Warning,
    /// Needs immediate action
    Danger,
}

/// Advisory message produced from spending statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Text shown to the user
    pub message: String,
    /// Rule that produced it
    pub kind: RecommendationKind,
    /// Presentation hint
    pub severity: Severity,
    /// 1 = high, 2 = medium, 3 = low
    pub priority: u8,
}

/// User preferences carried inside backups.
///
/// Backups use camelCase keys; configuration files may use snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Currency code used for display
    pub currency: String,
    /// Dark theme preference
    #[serde(alias = "dark_mode")]
    pub dark_mode: bool,
    /// Warn about high expenses
    #[serde(alias = "expense_alerts")]
    pub expense_alerts: bool,
    /// Remind about loans needing attention
    #[serde(alias = "loan_reminders")]
    pub loan_reminders: bool,
    /// Track savings goals
    #[serde(alias = "savings_goals")]
    pub savings_goals: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            currency: "XAF".to_string(),
            dark_mode: false,
            expense_alerts: true,
            loan_reminders: true,
            savings_goals: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(total: f64, remaining: f64) -> Loan {
        Loan {
            id: 1,
            contact_id: 1,
            amount: total,
            loan_type: LoanType::Given,
            date: 0,
            status: LoanStatus::from_remaining(remaining, total),
            interest_rate: 0.0,
            interest_amount: 0.0,
            total_amount: total,
            remaining_amount: remaining,
        }
    }

    #[test]
    fn test_status_three_way_rule() {
        assert_eq!(LoanStatus::from_remaining(1100.0, 1100.0), LoanStatus::Pending);
        assert_eq!(LoanStatus::from_remaining(500.0, 1100.0), LoanStatus::Partial);
        assert_eq!(LoanStatus::from_remaining(0.0, 1100.0), LoanStatus::Completed);
        assert_eq!(LoanStatus::from_remaining(-1.0, 1100.0), LoanStatus::Completed);
    }

    #[test]
    fn test_interest() {
        assert_eq!(Loan::interest_for(1000.0, 10.0), 100.0);
        assert_eq!(Loan::interest_for(250.0, 0.0), 0.0);
    }

    #[test]
    fn test_needs_alert() {
        assert!(loan(1000.0, 1000.0).needs_alert());
        assert!(loan(1000.0, 500.0).needs_alert());
        assert!(!loan(1000.0, 400.0).needs_alert());
        assert!(!loan(1000.0, 0.0).needs_alert());
        assert!(loan(0.0, 0.0).needs_alert());
    }

    #[test]
    fn test_remaining_after_never_negative() {
        let l = loan(100.0, 30.0);
        assert_eq!(l.remaining_after(50.0), 0.0);
        assert!(l.is_paid_in_full(30.0));
        assert!(!l.is_paid_in_full(29.99));
    }

    #[test]
    fn test_float_leftovers_settle_the_loan() {
        let total = 100.0 + Loan::interest_for(100.0, 3.3);
        let mut l = loan(total, total);
        l.remaining_amount = l.remaining_after(100.0);
        assert!(l.remaining_amount > 3.29 && l.remaining_amount < 3.31);

        assert!(!l.exceeds_remaining(3.3));
        assert!(l.is_paid_in_full(3.3));
        assert_eq!(l.remaining_after(3.3), 0.0);
        assert!(l.exceeds_remaining(3.31));
    }

    #[test]
    fn test_completed_loan_takes_no_payment() {
        let l = loan(100.0, 0.0);
        assert!(l.exceeds_remaining(0.001));
        assert!(!loan(100.0, 10.0).exceeds_remaining(10.0));
    }

    #[test]
    fn test_enum_text_round_trip() {
        assert_eq!("income".parse::<TransactionType>().ok(), Some(TransactionType::Income));
        assert_eq!(LoanType::Taken.as_str(), "TAKEN");
        assert!("SOMETIMES".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = Transaction {
            id: 4,
            tx_type: TransactionType::Savings,
            amount: -20.0,
            description: "Withdrawal: rent".into(),
            date: 1_700_000_000_000,
            category: Some(categories::SAVINGS_WITHDRAWAL.into()),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "SAVINGS");
        assert_eq!(json["category"], "Savings withdrawal");
    }

    #[test]
    fn test_settings_defaults_fill_missing_keys() {
        let settings: AppSettings = serde_json::from_str(r#"{"darkMode": true}"#).unwrap();
        assert!(settings.dark_mode);
        assert_eq!(settings.currency, "XAF");
    }
}
