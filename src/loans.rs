//! Loan ledger.
//!
//! Every loan creation and repayment writes one mirrored entry into the
//! transaction ledger so the current balance follows the money:
//!
//! | Event  | GIVEN                          | TAKEN                          |
//! |--------|--------------------------------|--------------------------------|
//! | create | EXPENSE `Loans given`          | INCOME `Loans taken`           |
//! | repay  | INCOME `Repayments received`   | EXPENSE `Repayments made`      |
//!
//! The loan row and its mirrored entry are written in the same unit of work.

use std::sync::Arc;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{FinanceError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{
    categories, Contact, ContactLoanSummary, Loan, LoanChanges, LoanStatus, LoanType, NewLoan, NewTransaction,
    Transaction, TransactionType,
};
use crate::repository;
use crate::transactions::ensure_balance;
use crate::utils::{Clock, SystemClock};
use crate::validation::InputValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoanEvent {
    Created,
    Repaid,
}

/// Ledger entry written alongside a loan event
fn mirrored_entry(loan_type: LoanType, event: LoanEvent, contact: &str, amount: f64, date: i64) -> NewTransaction {
    let (tx_type, category, description) = match (event, loan_type) {
        (LoanEvent::Created, LoanType::Given) => {
            (TransactionType::Expense, categories::LOANS_GIVEN, format!("Loan given to {contact}"))
        }
        (LoanEvent::Created, LoanType::Taken) => {
            (TransactionType::Income, categories::LOANS_TAKEN, format!("Loan received from {contact}"))
        }
        (LoanEvent::Repaid, LoanType::Given) => {
            (TransactionType::Income, categories::REPAYMENTS_RECEIVED, format!("Repayment received from {contact}"))
        }
        (LoanEvent::Repaid, LoanType::Taken) => {
            (TransactionType::Expense, categories::REPAYMENTS_MADE, format!("Repayment made to {contact}"))
        }
    };

    NewTransaction { tx_type, amount, description, date, category: Some(category.to_string()) }
}

/// Rewrite the creation entry recorded for `before` under `recorded_name` so
/// it matches `after` lent to or borrowed from `contact_name`.
///
/// The entry is found by exact type, amount, description, date and category.
/// Returns false if no such entry exists.
pub(crate) fn rewrite_creation_entry(
    conn: &Connection,
    before: &Loan,
    recorded_name: &str,
    after: &Loan,
    contact_name: &str,
) -> Result<bool> {
    let recorded = mirrored_entry(before.loan_type, LoanEvent::Created, recorded_name, before.amount, before.date);
    let Some(entry) = repository::transactions::find_matching(conn, &recorded)? else {
        return Ok(false);
    };

    let current = mirrored_entry(after.loan_type, LoanEvent::Created, contact_name, after.amount, after.date);
    repository::transactions::update(
        conn,
        &Transaction { amount: current.amount, description: current.description, ..entry },
    )?;
    Ok(true)
}

fn require_contact(conn: &Connection, contact_id: i64) -> Result<Contact> {
    repository::contacts::get(conn, contact_id)?.ok_or(FinanceError::ContactNotFound(contact_id))
}

fn require_loan(conn: &Connection, loan_id: i64) -> Result<Loan> {
    repository::loans::get(conn, loan_id)?.ok_or(FinanceError::LoanNotFound(loan_id))
}

#[derive(Clone)]
pub struct LoanLedger {
    db: Database,
    metrics: MetricsCollector,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LoanLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanLedger").field("db", &self.db).finish_non_exhaustive()
    }
}

impl LoanLedger {
    pub fn new(db: Database, metrics: MetricsCollector) -> Self {
        Self::with_clock(db, metrics, Arc::new(SystemClock))
    }

    /// Ledger whose repayment entries are dated by `clock`
    pub fn with_clock(db: Database, metrics: MetricsCollector, clock: Arc<dyn Clock>) -> Self {
        Self { db, metrics, clock }
    }

    /// Record a new loan together with its mirrored ledger entry.
    ///
    /// A GIVEN loan must be covered by the current balance.
    pub fn create(&self, loan: &NewLoan) -> Result<Loan> {
        self.metrics.track("loan.create", || {
            InputValidator::validate_amount(loan.amount)?;
            InputValidator::validate_interest_rate(loan.interest_rate)?;

            let created = self.db.unit_of_work("loan.create", |conn| {
                let contact = require_contact(conn, loan.contact_id)?;
                if loan.loan_type == LoanType::Given {
                    ensure_balance(conn, loan.amount)?;
                }

                let created = repository::loans::insert(conn, loan)?;
                let entry = mirrored_entry(loan.loan_type, LoanEvent::Created, &contact.name, loan.amount, loan.date);
                repository::transactions::insert(conn, &entry)?;
                Ok(created)
            })?;

            info!(
                loan_id = created.id,
                contact_id = created.contact_id,
                loan_type = %created.loan_type,
                total = created.total_amount,
                "Loan created"
            );
            Ok(created)
        })
    }

    /// Apply a repayment and record its mirrored ledger entry.
    ///
    /// Repaying a TAKEN loan must be covered by the current balance, and the
    /// payment may not exceed what is still owed. A leftover below half a
    /// cent settles the loan.
    pub fn repay(&self, loan_id: i64, payment: f64) -> Result<Loan> {
        self.metrics.track("loan.repay", || {
            InputValidator::validate_amount(payment)?;

            let repaid = self.db.unit_of_work("loan.repay", |conn| {
                let loan = require_loan(conn, loan_id)?;
                if loan.is_taken() {
                    ensure_balance(conn, payment)?;
                }
                if loan.exceeds_remaining(payment) {
                    warn!(loan_id, payment, remaining = loan.remaining_amount, "Payment exceeds remaining amount");
                    return Err(FinanceError::PaymentExceedsRemaining { remaining: loan.remaining_amount, payment });
                }

                let remaining_amount = loan.remaining_after(payment);
                let status = LoanStatus::from_remaining(remaining_amount, loan.total_amount);
                repository::loans::update_repayment(conn, loan_id, remaining_amount, status)?;

                let contact = require_contact(conn, loan.contact_id)?;
                let entry =
                    mirrored_entry(loan.loan_type, LoanEvent::Repaid, &contact.name, payment, self.clock.now_millis());
                repository::transactions::insert(conn, &entry)?;

                Ok(Loan { remaining_amount, status, ..loan })
            })?;

            info!(loan_id, payment, remaining = repaid.remaining_amount, status = %repaid.status, "Loan repaid");
            Ok(repaid)
        })
    }

    /// Change counterpart, principal or rate of a loan.
    ///
    /// Interest and total are recomputed and the remaining amount keeps the
    /// same share of the new total. The mirrored creation entry is rewritten
    /// to the new principal and contact; if it cannot be found the update is
    /// refused and nothing changes.
    pub fn update(&self, loan_id: i64, changes: &LoanChanges) -> Result<Loan> {
        self.metrics.track("loan.update", || {
            InputValidator::validate_amount(changes.amount)?;
            InputValidator::validate_interest_rate(changes.interest_rate)?;

            self.db.unit_of_work("loan.update", |conn| {
                let old = require_loan(conn, loan_id)?;
                let old_contact = require_contact(conn, old.contact_id)?;
                let new_contact = require_contact(conn, changes.contact_id)?;

                let interest_amount = Loan::interest_for(changes.amount, changes.interest_rate);
                let total_amount = changes.amount + interest_amount;
                let remaining_amount = if old.total_amount > 0.0 {
                    total_amount * (old.remaining_amount / old.total_amount)
                } else {
                    total_amount
                };

                let updated = Loan {
                    contact_id: changes.contact_id,
                    amount: changes.amount,
                    interest_rate: changes.interest_rate,
                    interest_amount,
                    total_amount,
                    remaining_amount,
                    status: LoanStatus::from_remaining(remaining_amount, total_amount),
                    ..old.clone()
                };
                repository::loans::update(conn, &updated)?;

                if !rewrite_creation_entry(conn, &old, &old_contact.name, &updated, &new_contact.name)? {
                    return Err(FinanceError::MirroredEntryMissing(loan_id));
                }

                info!(loan_id, total = total_amount, remaining = remaining_amount, "Loan updated");
                Ok(updated)
            })
        })
    }

    /// Delete a loan. Its mirrored ledger entries stay as history.
    pub fn remove(&self, loan_id: i64) -> Result<()> {
        self.metrics.track("loan.remove", || {
            let conn = self.db.get_connection()?;
            if !repository::loans::delete(&conn, loan_id)? {
                return Err(FinanceError::LoanNotFound(loan_id));
            }
            info!(loan_id, "Loan removed");
            Ok(())
        })
    }

    pub fn get(&self, loan_id: i64) -> Result<Loan> {
        let conn = self.db.get_connection()?;
        require_loan(&conn, loan_id)
    }

    /// Every loan, newest first
    pub fn list(&self) -> Result<Vec<Loan>> {
        let conn = self.db.get_connection()?;
        repository::loans::list(&conn)
    }

    /// Free-text search; an empty term lists everything
    pub fn search(&self, term: &str) -> Result<Vec<Loan>> {
        if term.trim().is_empty() {
            return self.list();
        }
        let conn = self.db.get_connection()?;
        repository::loans::search(&conn, term)
    }

    pub fn by_contact(&self, contact_id: i64) -> Result<Vec<Loan>> {
        let conn = self.db.get_connection()?;
        repository::loans::by_contact(&conn, contact_id)
    }

    pub fn by_status(&self, status: LoanStatus) -> Result<Vec<Loan>> {
        let conn = self.db.get_connection()?;
        repository::loans::by_status(&conn, status)
    }

    /// Loans dated within `[start, end]`
    pub fn by_date_range(&self, start: i64, end: i64) -> Result<Vec<Loan>> {
        InputValidator::validate_date_range(start, end)?;
        let conn = self.db.get_connection()?;
        repository::loans::by_date_range(&conn, start, end)
    }

    /// Loans that are barely repaid or exactly half way
    pub fn alerts(&self) -> Result<Vec<Loan>> {
        Ok(self.list()?.into_iter().filter(Loan::needs_alert).collect())
    }

    /// Given/taken totals and what is still outstanding with one contact
    pub fn contact_summary(&self, contact_id: i64) -> Result<ContactLoanSummary> {
        let conn = self.db.get_connection()?;
        require_contact(&conn, contact_id)?;

        let summary = repository::loans::by_contact(&conn, contact_id)?.iter().fold(
            ContactLoanSummary::default(),
            |mut summary, loan| {
                if loan.is_given() {
                    summary.total_given += loan.amount;
                    summary.outstanding_given += loan.remaining_amount;
                } else {
                    summary.total_taken += loan.amount;
                    summary.outstanding_taken += loan.remaining_amount;
                }
                summary
            },
        );
        Ok(summary)
    }
}
